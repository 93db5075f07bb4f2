//! Prometheus metrics for the storage node's netmap subsystem.
//!
//! Covers notification dispatch, periodic re-announcement and status
//! reconciliation. The [`NodeMetrics`] struct owns a dedicated [`Registry`]
//! that the RPC `/metrics` endpoint encodes into the Prometheus text
//! exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Notifications decoded and handed to handlers.
    pub events_dispatched: IntCounter,
    /// Notifications dropped because no parser is registered for their tag.
    pub events_dropped: IntCounter,
    /// Notifications whose payload failed to decode.
    pub events_rejected: IntCounter,
    /// Periodic re-announcements sent successfully.
    pub rebootstrap_sent: IntCounter,
    /// Periodic re-announcements that failed.
    pub rebootstrap_failed: IntCounter,
    /// Per-epoch status reconciliations skipped because the snapshot fetch failed.
    pub reconcile_failed: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Last epoch observed by the node.
    pub current_epoch: IntGauge,
    /// Local node state code as last resolved from a snapshot.
    pub local_state: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent fetching a netmap snapshot, in milliseconds.
    pub snapshot_fetch_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let events_dispatched = register_int_counter_with_registry!(
            Opts::new(
                "netmapd_events_dispatched_total",
                "Notifications decoded and delivered to handlers"
            ),
            registry
        )
        .expect("failed to register events_dispatched counter");

        let events_dropped = register_int_counter_with_registry!(
            Opts::new(
                "netmapd_events_dropped_total",
                "Notifications without a registered parser"
            ),
            registry
        )
        .expect("failed to register events_dropped counter");

        let events_rejected = register_int_counter_with_registry!(
            Opts::new(
                "netmapd_events_rejected_total",
                "Notifications whose payload could not be decoded"
            ),
            registry
        )
        .expect("failed to register events_rejected counter");

        let rebootstrap_sent = register_int_counter_with_registry!(
            Opts::new(
                "netmapd_rebootstrap_sent_total",
                "Periodic re-bootstrap transactions sent"
            ),
            registry
        )
        .expect("failed to register rebootstrap_sent counter");

        let rebootstrap_failed = register_int_counter_with_registry!(
            Opts::new(
                "netmapd_rebootstrap_failed_total",
                "Periodic re-bootstrap transactions that failed"
            ),
            registry
        )
        .expect("failed to register rebootstrap_failed counter");

        let reconcile_failed = register_int_counter_with_registry!(
            Opts::new(
                "netmapd_reconcile_failed_total",
                "Epochs whose status reconciliation was skipped"
            ),
            registry
        )
        .expect("failed to register reconcile_failed counter");

        // Gauges
        let current_epoch = register_int_gauge_with_registry!(
            Opts::new("netmapd_current_epoch", "Last epoch observed by the node"),
            registry
        )
        .expect("failed to register current_epoch gauge");

        let local_state = register_int_gauge_with_registry!(
            Opts::new(
                "netmapd_local_state",
                "Local node state code (1 = online, 2 = offline)"
            ),
            registry
        )
        .expect("failed to register local_state gauge");

        // Histograms – exponential buckets covering 1 ms → ~16 s.
        let snapshot_fetch_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "netmapd_snapshot_fetch_ms",
                "Netmap snapshot fetch time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register snapshot_fetch_ms histogram");

        Self {
            registry,
            events_dispatched,
            events_dropped,
            events_rejected,
            rebootstrap_sent,
            rebootstrap_failed,
            reconcile_failed,
            current_epoch,
            local_state,
            snapshot_fetch_ms,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_are_registered() {
        let metrics = NodeMetrics::new();
        metrics.events_dispatched.inc();
        metrics.snapshot_fetch_ms.observe(3.0);

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert_eq!(names.len(), 9);
        assert!(names.contains(&"netmapd_current_epoch".to_string()));
        assert!(names.contains(&"netmapd_rebootstrap_sent_total".to_string()));
    }
}
