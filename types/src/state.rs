//! State enums for netmap nodes and administrative status requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// The state of a node as published in the netmap.
///
/// `Other` carries ledger-level codes this node does not interpret; they are
/// passed through unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    #[default]
    Unspecified,
    Online,
    Offline,
    Other(u32),
}

impl NodeState {
    /// Ledger wire code of this state.
    pub fn code(&self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Online => 1,
            Self::Offline => 2,
            Self::Other(code) => *code,
        }
    }

    /// Inverse of [`NodeState::code`].
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Unspecified,
            1 => Self::Online,
            2 => Self::Offline,
            other => Self::Other(other),
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("UNSPECIFIED"),
            Self::Online => f.write_str("ONLINE"),
            Self::Offline => f.write_str("OFFLINE"),
            Self::Other(code) => write!(f, "STATE_{code}"),
        }
    }
}

/// Netmap status requested through the administrative control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetmapStatus {
    /// No status requested. Rejected by the node.
    Unspecified,
    Online,
    Offline,
}

impl FromStr for NetmapStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "unspecified" => Ok(Self::Unspecified),
            _ => Err(TypesError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for NetmapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("unspecified"),
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_named_states() {
        assert_eq!(NodeState::from_code(1), NodeState::Online);
        assert_eq!(NodeState::from_code(2), NodeState::Offline);
        assert_eq!(NodeState::from_code(0), NodeState::Unspecified);
    }

    #[test]
    fn unknown_codes_pass_through() {
        let state = NodeState::from_code(7);
        assert_eq!(state, NodeState::Other(7));
        assert_eq!(state.code(), 7);
        assert_eq!(state.to_string(), "STATE_7");
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!("ONLINE".parse::<NetmapStatus>().unwrap(), NetmapStatus::Online);
        assert_eq!("Offline".parse::<NetmapStatus>().unwrap(), NetmapStatus::Offline);
        assert!(matches!(
            "maintenance".parse::<NetmapStatus>(),
            Err(TypesError::UnknownStatus(_))
        ));
    }
}
