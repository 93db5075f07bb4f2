//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use netmapd_types::{parse_attributes, NodeInfo, PublicKey};

use crate::logging::LogFormat;
use crate::reconciler::ReBootstrapPolicy;
use crate::NodeError;

/// Configuration for a storage node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Call [`NodeConfig::validate`]
/// before wiring a node from it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Local node descriptor.
    #[serde(default)]
    pub node: NodeSection,

    /// Netmap participation.
    #[serde(default)]
    pub netmap: NetmapSection,

    /// HTTP surface.
    #[serde(default)]
    pub rpc: RpcSection,

    /// In-process dev ledger.
    #[serde(default)]
    pub dev: DevSection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeSection {
    /// Address announced to the netmap.
    #[serde(default = "default_address")]
    pub address: String,

    /// Hex-encoded public key identifying this node.
    #[serde(default)]
    pub public_key: String,

    /// `Key:Value` attributes; `\:` escapes a colon inside the key.
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetmapSection {
    /// Whether to re-announce the node periodically.
    #[serde(default)]
    pub rebootstrap_enabled: bool,

    /// Re-announce on every epoch divisible by this value. Must be positive.
    #[serde(default = "default_rebootstrap_interval")]
    pub rebootstrap_interval: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_rpc_port")]
    pub port: u16,

    /// Whether to serve Prometheus metrics on `/metrics`.
    #[serde(default = "default_true")]
    pub metrics: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DevSection {
    /// Seconds between epochs of the dev ledger.
    #[serde(default = "default_epoch_duration_secs")]
    pub epoch_duration_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_address() -> String {
    "/ip4/127.0.0.1/tcp/8080".to_string()
}

fn default_rebootstrap_interval() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_rpc_port() -> u16 {
    8090
}

fn default_epoch_duration_secs() -> u64 {
    30
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            node: NodeSection::default(),
            netmap: NetmapSection::default(),
            rpc: RpcSection::default(),
            dev: DevSection::default(),
        }
    }
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            public_key: String::new(),
            attributes: Vec::new(),
        }
    }
}

impl Default for NetmapSection {
    fn default() -> Self {
        Self {
            rebootstrap_enabled: false,
            rebootstrap_interval: default_rebootstrap_interval(),
        }
    }
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_rpc_port(),
            metrics: default_true(),
        }
    }
}

impl Default for DevSection {
    fn default() -> Self {
        Self {
            epoch_duration_secs: default_epoch_duration_secs(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Check every field a node needs before any of it is used.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.local_node_info()?;
        self.rebootstrap_policy()?;
        self.log_format()?;
        if self.dev.epoch_duration_secs == 0 {
            return Err(NodeError::Config(
                "dev.epoch_duration_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Local descriptor described by the `[node]` section.
    pub fn local_node_info(&self) -> Result<NodeInfo, NodeError> {
        if self.node.public_key.is_empty() {
            return Err(NodeError::Config("node.public_key is required".into()));
        }
        if self.node.address.is_empty() {
            return Err(NodeError::Config("node.address is required".into()));
        }
        let public_key = PublicKey::from_hex(&self.node.public_key)?;
        let attributes = parse_attributes(&self.node.attributes)?;
        Ok(NodeInfo::new(self.node.address.clone(), public_key).with_attributes(attributes))
    }

    pub fn rebootstrap_policy(&self) -> Result<ReBootstrapPolicy, NodeError> {
        ReBootstrapPolicy::new(
            self.netmap.rebootstrap_enabled,
            self.netmap.rebootstrap_interval,
        )
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}
