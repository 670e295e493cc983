//! Prometheus Metrics Module
//!
//! Application metrics in Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ingestion**: ticks received per feed, snapshots published
//! - **Series**: coalesced buffer depth
//! - **Playback**: sequencer steps taken
//!
//! Renderable through the handle returned by [`init_metrics`].

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "sonifier_ticks_ingested_total",
        "Total ticks pushed into the series buffer"
    );
    describe_counter!(
        "sonifier_snapshots_published_total",
        "Total snapshots broadcast to chart subscribers"
    );
    describe_counter!(
        "sonifier_playback_steps_total",
        "Total playback sequencer steps taken"
    );
    describe_gauge!(
        "sonifier_series_depth",
        "Buckets retained in the coalescing buffer at last flush"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for feed adapters.
#[derive(Debug, Clone, Copy)]
pub enum FeedKind {
    /// Historical record replay.
    Replay,
    /// Random-walk generator.
    Synthetic,
    /// External live transport.
    Live,
}

impl FeedKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Replay => "replay",
            Self::Synthetic => "synthetic",
            Self::Live => "live",
        }
    }
}

/// Record one tick pushed by a feed adapter.
pub fn record_tick_ingested(feed: FeedKind) {
    counter!(
        "sonifier_ticks_ingested_total",
        "feed" => feed.as_str()
    )
    .increment(1);
}

/// Record a snapshot broadcast, updating the depth gauge alongside.
#[allow(clippy::cast_precision_loss)]
pub fn record_snapshot_published(depth: usize) {
    counter!("sonifier_snapshots_published_total").increment(1);
    gauge!("sonifier_series_depth").set(depth as f64);
}

/// Record one playback sequencer step.
pub fn record_playback_step() {
    counter!("sonifier_playback_steps_total").increment(1);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_kind_as_str() {
        assert_eq!(FeedKind::Replay.as_str(), "replay");
        assert_eq!(FeedKind::Synthetic.as_str(), "synthetic");
        assert_eq!(FeedKind::Live.as_str(), "live");
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        // The metrics crate falls back to a no-op recorder; these must not
        // panic before init_metrics.
        record_tick_ingested(FeedKind::Synthetic);
        record_snapshot_published(42);
        record_playback_step();
    }
}
