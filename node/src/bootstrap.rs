//! Node-facing membership operations: announcing the node, resolving the
//! initial network state, and administrative status changes.
//!
//! Startup operations ([`BootstrapController::bootstrap`],
//! [`BootstrapController::init_state`]) return errors that must abort the
//! process. Administrative operations log their outcome and hand the error
//! back to the caller without ever bringing the node down.

use std::sync::Arc;

use netmapd_types::{NetmapStatus, NodeState};

use crate::reconciler::MembershipReconciler;
use crate::tracing_spans::control_span;
use crate::NodeError;

pub struct BootstrapController {
    reconciler: Arc<MembershipReconciler>,
}

impl BootstrapController {
    pub fn new(reconciler: Arc<MembershipReconciler>) -> Self {
        Self { reconciler }
    }

    /// Announce the node as `Online`. Fatal at startup.
    pub fn bootstrap(&self) -> Result<(), NodeError> {
        let descriptor = self.reconciler.local().online_descriptor();
        self.reconciler
            .ledger()
            .add_peer(&descriptor)
            .map_err(NodeError::Bootstrap)
    }

    /// Resolve the current epoch and the node's status in it.
    ///
    /// Must complete before notifications are delivered. The epoch is
    /// published only after the status is resolved, so nothing can observe
    /// the new epoch paired with a stale status from this path.
    pub fn init_state(&self) -> Result<u64, NodeError> {
        let epoch = self
            .reconciler
            .ledger()
            .epoch()
            .map_err(NodeError::InitEpoch)?;

        let entry = self
            .reconciler
            .local_node_state(epoch)
            .map_err(|source| NodeError::InitState { epoch, source })?;

        self.reconciler.apply(entry.as_ref());

        tracing::info!(
            epoch,
            state = %self.reconciler.local().status(),
            "initial network state"
        );

        self.reconciler.advance_epoch(epoch);
        Ok(epoch)
    }

    /// Ask the ledger to mark the node `Offline`. Never fatal.
    pub fn go_offline(&self) {
        let _span = control_span("go_offline").entered();
        match self.update_state(NodeState::Offline) {
            Ok(()) => tracing::info!("request to go offline successfully sent"),
            Err(e) => tracing::error!(error = %e, "could not go offline"),
        }
    }

    /// Administrative status change.
    ///
    /// `Online` re-announces the node, `Offline` updates its published
    /// state; anything else is refused without touching the ledger.
    pub fn set_status(&self, requested: NetmapStatus) -> Result<(), NodeError> {
        let _span = control_span("set_status").entered();

        let result = match requested {
            NetmapStatus::Online => self.bootstrap(),
            NetmapStatus::Offline => self.update_state(NodeState::Offline),
            NetmapStatus::Unspecified => Err(NodeError::UnsupportedStatus(requested)),
        };

        match &result {
            Ok(()) => tracing::info!(status = %requested, "netmap status change sent"),
            Err(e) => tracing::error!(status = %requested, error = %e, "could not change netmap status"),
        }
        result
    }

    pub fn reconciler(&self) -> &Arc<MembershipReconciler> {
        &self.reconciler
    }

    fn update_state(&self, state: NodeState) -> Result<(), NodeError> {
        let local = self.reconciler.local();
        self.reconciler
            .ledger()
            .update_peer_state(local.public_key(), state)
            .map_err(NodeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch_state::NetworkState;
    use crate::local_node::LocalNode;
    use crate::metrics::NodeMetrics;
    use crate::reconciler::ReBootstrapPolicy;
    use netmapd_nullables::{LedgerCall, LedgerOp, NullLedger};
    use netmapd_types::{Netmap, NodeInfo, PublicKey};

    fn controller(ledger: Arc<NullLedger>) -> BootstrapController {
        let local = Arc::new(LocalNode::new(NodeInfo::new(
            "/ip4/127.0.0.1/tcp/8080",
            PublicKey::new(vec![1; 33]).unwrap(),
        )));
        BootstrapController::new(Arc::new(MembershipReconciler::new(
            ledger,
            Arc::new(NetworkState::new()),
            local,
            ReBootstrapPolicy::disabled(),
            Arc::new(NodeMetrics::new()),
        )))
    }

    fn key() -> PublicKey {
        PublicKey::new(vec![1; 33]).unwrap()
    }

    #[test]
    fn bootstrap_announces_online() {
        let ledger = Arc::new(NullLedger::new());
        controller(ledger.clone()).bootstrap().unwrap();

        let announced = ledger.announced();
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].state, NodeState::Online);
        assert_eq!(announced[0].public_key, key());
    }

    #[test]
    fn bootstrap_failure_is_fatal() {
        let ledger = Arc::new(NullLedger::new());
        ledger.fail(LedgerOp::AddPeer);
        assert!(matches!(
            controller(ledger).bootstrap(),
            Err(NodeError::Bootstrap(_))
        ));
    }

    #[test]
    fn init_state_sets_epoch_and_status() {
        let ledger = Arc::new(NullLedger::new());
        ledger.set_epoch(9);
        let c = controller(ledger.clone());
        ledger.put_snapshot(Netmap::new(9, vec![c.reconciler.local().online_descriptor()]));

        assert_eq!(c.init_state().unwrap(), 9);
        assert_eq!(c.reconciler.state().current_epoch(), 9);
        assert_eq!(c.reconciler.local().status(), NodeState::Online);
        assert_eq!(
            ledger.calls(),
            vec![LedgerCall::Epoch, LedgerCall::NetmapByEpoch(9)]
        );
    }

    #[test]
    fn init_state_epoch_failure_is_fatal() {
        let ledger = Arc::new(NullLedger::new());
        ledger.fail(LedgerOp::Epoch);
        let c = controller(ledger);
        assert!(matches!(c.init_state(), Err(NodeError::InitEpoch(_))));
    }

    #[test]
    fn init_state_snapshot_failure_leaves_epoch_unset() {
        let ledger = Arc::new(NullLedger::new());
        ledger.set_epoch(4);
        // No snapshot scripted for epoch 4.
        let c = controller(ledger);

        assert!(matches!(
            c.init_state(),
            Err(NodeError::InitState { epoch: 4, .. })
        ));
        assert_eq!(c.reconciler.state().current_epoch(), 0);
    }

    #[test]
    fn go_offline_sends_offline_state() {
        let ledger = Arc::new(NullLedger::new());
        controller(ledger.clone()).go_offline();
        assert_eq!(ledger.state_updates(), vec![(key(), NodeState::Offline)]);
    }

    #[test]
    fn go_offline_failure_is_swallowed() {
        let ledger = Arc::new(NullLedger::new());
        ledger.fail(LedgerOp::UpdatePeerState);
        controller(ledger.clone()).go_offline();
        assert_eq!(ledger.state_updates().len(), 1);
    }

    #[test]
    fn set_status_online_reannounces() {
        let ledger = Arc::new(NullLedger::new());
        controller(ledger.clone())
            .set_status(NetmapStatus::Online)
            .unwrap();
        assert_eq!(ledger.announced().len(), 1);
        assert!(ledger.state_updates().is_empty());
    }

    #[test]
    fn set_status_offline_updates_state() {
        let ledger = Arc::new(NullLedger::new());
        controller(ledger.clone())
            .set_status(NetmapStatus::Offline)
            .unwrap();
        assert_eq!(ledger.state_updates(), vec![(key(), NodeState::Offline)]);
    }

    #[test]
    fn set_status_returns_ledger_errors() {
        let ledger = Arc::new(NullLedger::new());
        ledger.fail(LedgerOp::UpdatePeerState);
        assert!(matches!(
            controller(ledger).set_status(NetmapStatus::Offline),
            Err(NodeError::Ledger(_))
        ));
    }

    #[test]
    fn unspecified_status_is_refused_without_ledger_call() {
        let ledger = Arc::new(NullLedger::new());
        let result = controller(ledger.clone()).set_status(NetmapStatus::Unspecified);
        assert!(matches!(
            result,
            Err(NodeError::UnsupportedStatus(NetmapStatus::Unspecified))
        ));
        assert!(ledger.calls().is_empty());
    }
}
