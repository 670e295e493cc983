//! Broadcast Channel Adapters
//!
//! Fan-out of snapshots and playback-position updates to downstream
//! collaborators using tokio broadcast channels.
//!
//! # Architecture
//!
//! The [`SnapshotHub`] provides one channel per event kind:
//! - flushed series snapshots for the charting collaborator
//! - playback index updates for highlighting the sounding point
//!
//! Each channel supports multiple receivers with configurable capacity.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::application::ports::{IndexObserver, SnapshotSink};
use crate::application::services::playback::PlaybackCursor;
use crate::domain::series::Snapshot;
use crate::infrastructure::metrics;

// =============================================================================
// Broadcast Messages
// =============================================================================

/// Playback-position broadcast message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexUpdate {
    /// The sounding point index; `None` on completion or abort.
    pub index: Option<usize>,
}

// =============================================================================
// Snapshot Hub
// =============================================================================

/// Configuration for broadcast channel capacities.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Capacity of the snapshot channel.
    pub snapshots_capacity: usize,
    /// Capacity of the index-update channel.
    pub indices_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            snapshots_capacity: 64,
            indices_capacity: 256,
        }
    }
}

/// Central hub for chart-facing broadcasts.
///
/// # Example
///
/// ```rust
/// use sonification_engine::infrastructure::broadcast::SnapshotHub;
///
/// let hub = SnapshotHub::with_defaults();
/// let mut rx = hub.snapshots_rx();
/// // elsewhere: hub.send_snapshot(snapshot);
/// ```
#[derive(Debug)]
pub struct SnapshotHub {
    snapshots_tx: broadcast::Sender<Snapshot>,
    indices_tx: broadcast::Sender<IndexUpdate>,
}

impl SnapshotHub {
    /// Create a hub with the given capacities.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        Self {
            snapshots_tx: broadcast::channel(config.snapshots_capacity).0,
            indices_tx: broadcast::channel(config.indices_capacity).0,
        }
    }

    /// Create a hub with default capacities.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(HubConfig::default())
    }

    /// Send a snapshot to all chart subscribers.
    ///
    /// Returns the number of receivers, or `None` when nobody listens.
    pub fn send_snapshot(&self, snapshot: Snapshot) -> Option<usize> {
        self.snapshots_tx.send(snapshot).ok()
    }

    /// Get a new receiver for snapshots.
    #[must_use]
    pub fn snapshots_rx(&self) -> broadcast::Receiver<Snapshot> {
        self.snapshots_tx.subscribe()
    }

    /// Send a playback index update to all subscribers.
    pub fn send_index(&self, index: Option<usize>) -> Option<usize> {
        self.indices_tx.send(IndexUpdate { index }).ok()
    }

    /// Get a new receiver for index updates.
    #[must_use]
    pub fn indices_rx(&self) -> broadcast::Receiver<IndexUpdate> {
        self.indices_tx.subscribe()
    }

    /// Active receiver counts across both channels.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            snapshot_receivers: self.snapshots_tx.receiver_count(),
            index_receivers: self.indices_tx.receiver_count(),
        }
    }
}

/// Shared hub reference.
pub type SharedSnapshotHub = Arc<SnapshotHub>;

/// Receiver counts per channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct HubStats {
    /// Number of snapshot receivers.
    pub snapshot_receivers: usize,
    /// Number of index-update receivers.
    pub index_receivers: usize,
}

// =============================================================================
// Port Adapters
// =============================================================================

impl SnapshotSink for SnapshotHub {
    fn publish(&self, snapshot: Snapshot) {
        metrics::record_snapshot_published(snapshot.len());
        let _ = self.send_snapshot(snapshot);
    }
}

/// Index observer that records the shared cursor and fans the update out.
///
/// Wired between the playback engine and the hub so the chart and the
/// flush loop both follow the sounding point.
#[derive(Debug)]
pub struct HubIndexObserver {
    hub: SharedSnapshotHub,
    cursor: Arc<PlaybackCursor>,
}

impl HubIndexObserver {
    /// Create the observer.
    #[must_use]
    pub fn new(hub: SharedSnapshotHub, cursor: Arc<PlaybackCursor>) -> Self {
        Self { hub, cursor }
    }
}

impl IndexObserver for HubIndexObserver {
    fn on_index_changed(&self, index: Option<usize>) {
        self.cursor.set(index);
        if index.is_some() {
            metrics::record_playback_step();
        }
        let _ = self.hub.send_index(index);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_creation_has_no_receivers() {
        let hub = SnapshotHub::with_defaults();
        let stats = hub.stats();
        assert_eq!(stats.snapshot_receivers, 0);
        assert_eq!(stats.index_receivers, 0);
    }

    #[test]
    fn send_with_no_receivers_returns_none() {
        let hub = SnapshotHub::with_defaults();
        assert!(hub.send_snapshot(Snapshot::default()).is_none());
        assert!(hub.send_index(Some(3)).is_none());
    }

    #[tokio::test]
    async fn multiple_receivers_get_the_same_snapshot() {
        let hub = SnapshotHub::with_defaults();
        let mut rx1 = hub.snapshots_rx();
        let mut rx2 = hub.snapshots_rx();

        assert_eq!(hub.send_snapshot(Snapshot::default()), Some(2));

        assert!(rx1.recv().await.unwrap().is_empty());
        assert!(rx2.recv().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn observer_updates_cursor_and_broadcasts() {
        let hub = Arc::new(SnapshotHub::with_defaults());
        let cursor = Arc::new(PlaybackCursor::new());
        let observer = HubIndexObserver::new(Arc::clone(&hub), Arc::clone(&cursor));
        let mut rx = hub.indices_rx();

        observer.on_index_changed(Some(4));
        assert_eq!(cursor.get(), Some(4));
        assert_eq!(rx.recv().await.unwrap(), IndexUpdate { index: Some(4) });

        observer.on_index_changed(None);
        assert_eq!(cursor.get(), None);
        assert_eq!(rx.recv().await.unwrap(), IndexUpdate { index: None });
    }

    #[test]
    fn receiver_count_tracks_drops() {
        let hub = SnapshotHub::with_defaults();
        {
            let _rx = hub.snapshots_rx();
            assert_eq!(hub.stats().snapshot_receivers, 1);
        }
        assert_eq!(hub.stats().snapshot_receivers, 0);
    }
}
