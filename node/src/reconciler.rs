//! Reactions to new-epoch notifications.
//!
//! Three independent handlers are subscribed to `NewEpoch`:
//! 1. epoch advance: record the epoch in [`NetworkState`];
//! 2. re-bootstrap: re-announce the node every `interval` epochs (only
//!    subscribed when enabled);
//! 3. status reconciliation: adopt the local entry of the epoch's snapshot.
//!
//! Each reaction takes the epoch from the event itself, never from
//! [`NetworkState`], so their relative order does not matter.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Instant;

use netmapd_ledger::{LedgerClient, LedgerError};
use netmapd_types::{NodeInfo, NodeState};

use crate::epoch_state::NetworkState;
use crate::event::{parse_new_epoch, Event, EventType, NewEpoch};
use crate::event_registry::EventRegistry;
use crate::local_node::LocalNode;
use crate::metrics::NodeMetrics;
use crate::tracing_spans::epoch_span;
use crate::NodeError;

/// When to re-announce the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReBootstrapPolicy {
    enabled: bool,
    interval: NonZeroU64,
}

impl ReBootstrapPolicy {
    /// Fails on a zero interval, even when disabled.
    pub fn new(enabled: bool, interval: u64) -> Result<Self, NodeError> {
        let interval = NonZeroU64::new(interval)
            .ok_or_else(|| NodeError::Config("rebootstrap_interval must be positive".into()))?;
        Ok(Self { enabled, interval })
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            interval: NonZeroU64::MIN,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> u64 {
        self.interval.get()
    }

    /// Whether `epoch` triggers a re-announcement.
    pub fn fires(&self, epoch: u64) -> bool {
        self.enabled && epoch % self.interval.get() == 0
    }
}

pub struct MembershipReconciler {
    ledger: Arc<dyn LedgerClient>,
    state: Arc<NetworkState>,
    local: Arc<LocalNode>,
    policy: ReBootstrapPolicy,
    metrics: Arc<NodeMetrics>,
}

impl MembershipReconciler {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        state: Arc<NetworkState>,
        local: Arc<LocalNode>,
        policy: ReBootstrapPolicy,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            ledger,
            state,
            local,
            policy,
            metrics,
        }
    }

    pub fn policy(&self) -> ReBootstrapPolicy {
        self.policy
    }

    /// Subscribe the new-epoch parser and reactions.
    pub fn register(self: &Arc<Self>, registry: &mut EventRegistry) {
        let tag = EventType::new_epoch();
        registry.register_parser(tag.clone(), Box::new(parse_new_epoch));

        let this = Arc::clone(self);
        registry.register_handler(
            tag.clone(),
            Box::new(move |event| {
                if let Some(epoch) = new_epoch_of(event) {
                    this.advance_epoch(epoch);
                }
            }),
        );

        if self.policy.enabled() {
            let this = Arc::clone(self);
            registry.register_handler(
                tag.clone(),
                Box::new(move |event| {
                    if let Some(epoch) = new_epoch_of(event) {
                        // Failures are logged inside; the next qualifying epoch retries.
                        let _ = this.rebootstrap(epoch);
                    }
                }),
            );
        }

        let this = Arc::clone(self);
        registry.register_handler(
            tag,
            Box::new(move |event| {
                if let Some(epoch) = new_epoch_of(event) {
                    let _ = this.reconcile_status(epoch);
                }
            }),
        );
    }

    /// Record `epoch` as the current one.
    pub fn advance_epoch(&self, epoch: u64) {
        self.state.set_current_epoch(epoch);
        self.metrics
            .current_epoch
            .set(i64::try_from(epoch).unwrap_or(i64::MAX));
    }

    /// Re-announce the node if `epoch` is due under the policy.
    ///
    /// Returns `None` when nothing was due. A failed announcement is logged
    /// as a warning and otherwise ignored.
    pub fn rebootstrap(&self, epoch: u64) -> Option<Result<(), LedgerError>> {
        if !self.policy.fires(epoch) {
            return None;
        }

        let result = self.ledger.add_peer(&self.local.online_descriptor());
        match &result {
            Ok(()) => {
                self.metrics.rebootstrap_sent.inc();
                tracing::debug!(epoch, "re-bootstrap transaction sent");
            }
            Err(e) => {
                self.metrics.rebootstrap_failed.inc();
                tracing::warn!(epoch, error = %e, "can't send re-bootstrap tx");
            }
        }
        Some(result)
    }

    /// Fetch the snapshot for `epoch` and return the local entry, if any.
    pub fn local_node_state(&self, epoch: u64) -> Result<Option<NodeInfo>, LedgerError> {
        let started = Instant::now();
        let netmap = self.ledger.netmap_by_epoch(epoch);
        self.metrics
            .snapshot_fetch_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        Ok(netmap?.find_node(self.local.public_key()).cloned())
    }

    /// Adopt the local entry of `epoch`'s snapshot as the node status.
    ///
    /// A failed fetch is logged and skipped; the next epoch gets another
    /// chance. A node absent from the snapshot keeps its previous status.
    pub fn reconcile_status(&self, epoch: u64) -> Result<Option<NodeState>, LedgerError> {
        let _span = epoch_span(epoch).entered();

        let entry = match self.local_node_state(epoch) {
            Ok(entry) => entry,
            Err(e) => {
                self.metrics.reconcile_failed.inc();
                tracing::error!(epoch, error = %e, "could not update node state on new epoch");
                return Err(e);
            }
        };

        if entry.is_none() {
            tracing::warn!(epoch, "local node is absent from the netmap, status unchanged");
        }
        Ok(self.apply(entry.as_ref()))
    }

    pub(crate) fn apply(&self, entry: Option<&NodeInfo>) -> Option<NodeState> {
        let applied = self.local.handle_node_info(entry);
        if let Some(state) = applied {
            self.metrics.local_state.set(i64::from(state.code()));
        }
        applied
    }

    pub(crate) fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub(crate) fn local(&self) -> &Arc<LocalNode> {
        &self.local
    }

    pub(crate) fn state(&self) -> &Arc<NetworkState> {
        &self.state
    }
}

fn new_epoch_of(event: &Event) -> Option<u64> {
    match event {
        Event::NewEpoch(NewEpoch { epoch }) => Some(*epoch),
        _ => None,
    }
}
