//! The storage node: wires the netmap subsystem together and drives its
//! lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use netmapd_ledger::{LedgerClient, Notification};
use netmapd_rpc::{ControlError, NetmapControl, RpcServer, RpcState};
use netmapd_types::{NetmapStatus, NodeInfo};

use crate::bootstrap::BootstrapController;
use crate::config::NodeConfig;
use crate::dispatcher::EventDispatcher;
use crate::epoch_state::NetworkState;
use crate::error::NodeError;
use crate::event_registry::EventRegistry;
use crate::listener::EventListener;
use crate::local_node::LocalNode;
use crate::metrics::NodeMetrics;
use crate::reconciler::MembershipReconciler;
use crate::shutdown::ShutdownController;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct StorageNode {
    config: NodeConfig,
    state: Arc<NetworkState>,
    local: Arc<LocalNode>,
    metrics: Arc<NodeMetrics>,
    controller: Arc<BootstrapController>,
    dispatcher: Arc<EventDispatcher>,
    /// Taken by the listener task on start.
    notifications: Option<broadcast::Receiver<Notification>>,
    shutdown: ShutdownController,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl StorageNode {
    /// Wire a node from `config`.
    ///
    /// `notifications` should be subscribed before the ledger can emit
    /// anything the node must see; events arriving before [`start`] are
    /// buffered by the channel and delivered once initialisation is done.
    ///
    /// [`start`]: StorageNode::start
    pub fn new(
        config: NodeConfig,
        ledger: Arc<dyn LedgerClient>,
        notifications: broadcast::Receiver<Notification>,
    ) -> Result<Self, NodeError> {
        Self::with_subscriptions(config, ledger, notifications, |_| {})
    }

    /// Like [`new`](StorageNode::new), but lets the caller add parsers and
    /// handlers to the registry before it is sealed into the dispatcher.
    pub fn with_subscriptions(
        config: NodeConfig,
        ledger: Arc<dyn LedgerClient>,
        notifications: broadcast::Receiver<Notification>,
        subscribe: impl FnOnce(&mut EventRegistry),
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let state = Arc::new(NetworkState::new());
        let local = Arc::new(LocalNode::new(config.local_node_info()?));
        let metrics = Arc::new(NodeMetrics::new());

        let reconciler = Arc::new(MembershipReconciler::new(
            ledger,
            Arc::clone(&state),
            Arc::clone(&local),
            config.rebootstrap_policy()?,
            Arc::clone(&metrics),
        ));

        let mut registry = EventRegistry::new();
        reconciler.register(&mut registry);
        subscribe(&mut registry);

        let dispatcher =
            Arc::new(EventDispatcher::new(registry).with_metrics(Arc::clone(&metrics)));
        let controller = Arc::new(BootstrapController::new(reconciler));

        Ok(Self {
            config,
            state,
            local,
            metrics,
            controller,
            dispatcher,
            notifications: Some(notifications),
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        })
    }

    /// Resolve the initial network state, announce the node and start
    /// delivering notifications.
    ///
    /// Any error here means the node must not run.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        let notifications = self
            .notifications
            .take()
            .ok_or_else(|| NodeError::Config("storage node already started".into()))?;

        let controller = Arc::clone(&self.controller);
        let epoch = tokio::task::spawn_blocking(move || controller.init_state()).await??;

        let controller = Arc::clone(&self.controller);
        tokio::task::spawn_blocking(move || controller.bootstrap()).await??;

        tracing::info!(
            epoch,
            public_key = %self.local.public_key(),
            rebootstrap = self.controller.reconciler().policy().enabled(),
            "storage node started"
        );

        let listener = EventListener::new(Arc::clone(&self.dispatcher));
        let shutdown_rx = self.shutdown.subscribe();
        self.task_handles
            .push(tokio::spawn(listener.run(notifications, shutdown_rx)));

        if self.config.rpc.enabled {
            self.spawn_rpc();
        }
        Ok(())
    }

    fn spawn_rpc(&mut self) {
        let rpc_state = Arc::new(RpcState {
            control: Arc::new(NodeControl {
                controller: Arc::clone(&self.controller),
                state: Arc::clone(&self.state),
                local: Arc::clone(&self.local),
            }),
            metrics: self
                .config
                .rpc
                .metrics
                .then(|| self.metrics.registry.clone()),
        });

        let rpc_server = RpcServer::with_state(self.config.rpc.port, rpc_state);
        let mut shutdown_rx_rpc = self.shutdown.subscribe();

        let rpc_handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown_rx_rpc.recv() => {
                    tracing::info!("RPC server shutting down");
                }
                result = rpc_server.start() => {
                    match result {
                        Ok(()) => tracing::info!("RPC server exited"),
                        Err(e) => tracing::error!("RPC server error: {e}"),
                    }
                }
            }
        });
        self.task_handles.push(rpc_handle);
    }

    /// Ask the ledger to take the node offline, then stop every task.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("storage node stopping");

        let controller = Arc::clone(&self.controller);
        if let Err(e) = tokio::task::spawn_blocking(move || controller.go_offline()).await {
            tracing::error!(error = %e, "go-offline task failed");
        }

        self.shutdown.shutdown();

        let handles = std::mem::take(&mut self.task_handles);
        let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background task ended abnormally");
                }
            }
        })
        .await;

        if joined.is_err() {
            tracing::warn!("timed out waiting for background tasks");
            return Err(NodeError::ShutdownTimeout);
        }

        tracing::info!("storage node stopped");
        Ok(())
    }

    pub fn current_epoch(&self) -> u64 {
        self.state.current_epoch()
    }

    pub fn local_node(&self) -> &Arc<LocalNode> {
        &self.local
    }

    pub fn controller(&self) -> &Arc<BootstrapController> {
        &self.controller
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }
}

/// Bridges the RPC surface to the bootstrap controller.
struct NodeControl {
    controller: Arc<BootstrapController>,
    state: Arc<NetworkState>,
    local: Arc<LocalNode>,
}

impl NetmapControl for NodeControl {
    fn local_node_info(&self) -> NodeInfo {
        self.local.descriptor()
    }

    fn current_epoch(&self) -> u64 {
        self.state.current_epoch()
    }

    fn set_netmap_status(&self, status: NetmapStatus) -> Result<(), ControlError> {
        self.controller.set_status(status).map_err(|e| match e {
            NodeError::UnsupportedStatus(status) => ControlError::UnsupportedStatus(status),
            other => ControlError::Failed(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmapd_nullables::{LedgerOp, NullLedger};
    use netmapd_types::{Netmap, NodeState, PublicKey};

    const KEY: &str = "02b3622bf4017bdfe317c58aed5f4c753f206b7db896046fa7d774bbc4bf7f8dc2";

    fn config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.node.public_key = KEY.into();
        config.rpc.enabled = false;
        config
    }

    fn online_entry() -> NodeInfo {
        NodeInfo::new("/ip4/127.0.0.1/tcp/8080", PublicKey::from_hex(KEY).unwrap())
            .with_state(NodeState::Online)
    }

    #[test]
    fn invalid_config_is_rejected_before_wiring() {
        let (_tx, rx) = broadcast::channel(4);
        let result = StorageNode::new(NodeConfig::default(), Arc::new(NullLedger::new()), rx);
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[tokio::test]
    async fn start_resolves_state_then_announces() {
        let ledger = Arc::new(NullLedger::new());
        ledger.set_epoch(6);
        ledger.put_snapshot(Netmap::new(6, vec![online_entry()]));

        let (_tx, rx) = broadcast::channel(4);
        let mut node = StorageNode::new(config(), ledger.clone(), rx).unwrap();
        node.start().await.unwrap();

        assert_eq!(node.current_epoch(), 6);
        assert_eq!(node.local_node().status(), NodeState::Online);
        assert_eq!(ledger.announced().len(), 1);

        node.stop().await.unwrap();
        assert_eq!(
            ledger.state_updates(),
            vec![(PublicKey::from_hex(KEY).unwrap(), NodeState::Offline)]
        );
    }

    #[tokio::test]
    async fn start_fails_when_initial_state_is_unknown() {
        let ledger = Arc::new(NullLedger::new());
        ledger.set_epoch(2);

        let (_tx, rx) = broadcast::channel(4);
        let mut node = StorageNode::new(config(), ledger.clone(), rx).unwrap();
        assert!(matches!(
            node.start().await,
            Err(NodeError::InitState { epoch: 2, .. })
        ));
        assert!(ledger.announced().is_empty());
    }

    #[tokio::test]
    async fn start_fails_when_bootstrap_fails() {
        let ledger = Arc::new(NullLedger::new());
        ledger.put_snapshot(Netmap::new(0, Vec::new()));
        ledger.fail(LedgerOp::AddPeer);

        let (_tx, rx) = broadcast::channel(4);
        let mut node = StorageNode::new(config(), ledger, rx).unwrap();
        assert!(matches!(node.start().await, Err(NodeError::Bootstrap(_))));
    }

    #[tokio::test]
    async fn start_twice_is_refused() {
        let ledger = Arc::new(NullLedger::new());
        ledger.put_snapshot(Netmap::new(0, Vec::new()));

        let (_tx, rx) = broadcast::channel(4);
        let mut node = StorageNode::new(config(), ledger, rx).unwrap();
        node.start().await.unwrap();
        assert!(matches!(node.start().await, Err(NodeError::Config(_))));
        node.stop().await.unwrap();
    }

    #[test]
    fn control_maps_unsupported_status() {
        let ledger = Arc::new(NullLedger::new());
        let (_tx, rx) = broadcast::channel(4);
        let node = StorageNode::new(config(), ledger.clone(), rx).unwrap();
        let control = NodeControl {
            controller: Arc::clone(&node.controller),
            state: Arc::clone(&node.state),
            local: Arc::clone(&node.local),
        };

        assert!(matches!(
            control.set_netmap_status(NetmapStatus::Unspecified),
            Err(ControlError::UnsupportedStatus(NetmapStatus::Unspecified))
        ));

        ledger.fail(LedgerOp::UpdatePeerState);
        assert!(matches!(
            control.set_netmap_status(NetmapStatus::Offline),
            Err(ControlError::Failed(_))
        ));
        assert_eq!(control.local_node_info().state, NodeState::Offline);
    }
}
