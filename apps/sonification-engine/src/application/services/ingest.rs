//! Ingest Service
//!
//! Owns the series buffer and the flush cadence: on a fixed interval it
//! drains pending ticks, publishes the resulting snapshot to the chart
//! collaborator, and refreshes the point sequence the playback engine
//! reads on the next `Play` command.
//!
//! ```text
//! TickSender ──> SeriesBuffer ──flush──> Snapshot ──> SnapshotSink
//!                                    └──> SphereMapper ──> shared points
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::application::ports::SnapshotSink;
use crate::application::services::playback::PlaybackCursor;
use crate::domain::series::SeriesBuffer;
use crate::domain::spatial::{SphereMapper, SpherePoint};

/// Shared, always-current point sequence for the next playback request.
pub type SharedPoints = Arc<Mutex<Vec<SpherePoint>>>;

/// Periodic flush loop between the tick feed and snapshot consumers.
pub struct IngestService<S: SnapshotSink> {
    buffer: SeriesBuffer,
    sink: Arc<S>,
    mapper: SphereMapper,
    cursor: Arc<PlaybackCursor>,
    points: SharedPoints,
    cadence: Duration,
}

impl<S: SnapshotSink> IngestService<S> {
    /// Create the service around an already-wired buffer.
    #[must_use]
    pub fn new(
        buffer: SeriesBuffer,
        sink: Arc<S>,
        cursor: Arc<PlaybackCursor>,
        points: SharedPoints,
        cadence: Duration,
    ) -> Self {
        Self {
            buffer,
            sink,
            mapper: SphereMapper::default(),
            cursor,
            points,
            cadence,
        }
    }

    /// Run the flush loop until shutdown.
    ///
    /// Each tick of the interval performs one atomic drain-merge-publish
    /// step; ticks arriving mid-flush land in the next one.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.cadence);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(cadence = ?self.cadence, "ingest service started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => self.flush_once(),
            }
        }

        tracing::info!("ingest service stopped");
    }

    /// One flush: drain, merge, map, publish.
    pub fn flush_once(&mut self) {
        let snapshot = self.buffer.flush(self.cursor.get());
        *self.points.lock() = self.mapper.map(&snapshot);
        self.sink.publish(snapshot);
    }
}

// =============================================================================
// Tests
// =============================================================================
