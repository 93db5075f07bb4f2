//! Process-wide view of the last observed epoch.

use std::sync::atomic::{AtomicU64, Ordering};

/// Last epoch number observed by this node.
///
/// Starts at 0 and is written by the epoch-advance reaction and by initial
/// state resolution. Readers never block. Monotonicity is not enforced: the
/// last writer wins.
#[derive(Debug, Default)]
pub struct NetworkState {
    epoch: AtomicU64,
}

impl NetworkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn set_current_epoch(&self, epoch: u64) {
        self.epoch.store(epoch, Ordering::Release);
    }
}
