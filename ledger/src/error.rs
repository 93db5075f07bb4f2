use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("netmap snapshot for epoch {0} not found")]
    SnapshotNotFound(u64),

    #[error("peer {0} is not a netmap candidate")]
    PeerNotFound(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),
}
