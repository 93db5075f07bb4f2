use netmapd_ledger::LedgerError;
use netmapd_types::{NetmapStatus, TypesError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("bootstrap error: {0}")]
    Bootstrap(#[source] LedgerError),

    #[error("could not initialize current epoch number: {0}")]
    InitEpoch(#[source] LedgerError),

    #[error("could not init network state at epoch {epoch}: {source}")]
    InitState {
        epoch: u64,
        #[source]
        source: LedgerError,
    },

    #[error("unsupported netmap status: {0}")]
    UnsupportedStatus(NetmapStatus),

    #[error("invalid node descriptor: {0}")]
    Types(#[from] TypesError),

    #[error("config error: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}
