//! Historical Record Replay
//!
//! Bulk loader: reads a JSON array of tick records (the flat wire shape)
//! and pushes them through the sink, optionally paced to mimic a live
//! feed. Malformed numeric fields inside records are coerced by the lenient
//! tick codec, never skipped.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FeedError, TickSource};
use crate::domain::series::{Tick, TickSender};
use crate::infrastructure::metrics;

/// Replays a historical record file through the tick sink.
#[derive(Debug)]
pub struct ReplayFeed {
    path: PathBuf,
    pace: Duration,
}

impl ReplayFeed {
    /// Create a replay over `path`; `pace` is the delay between records
    /// (zero pushes the whole batch at once).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, pace: Duration) -> Self {
        Self {
            path: path.into(),
            pace,
        }
    }
}

#[async_trait]
impl TickSource for ReplayFeed {
    async fn run(
        self: Box<Self>,
        sink: TickSender,
        shutdown: CancellationToken,
    ) -> Result<(), FeedError> {
        let raw = tokio::fs::read(&self.path).await?;
        let ticks: Vec<Tick> = serde_json::from_slice(&raw)?;
        tracing::info!(
            path = %self.path.display(),
            records = ticks.len(),
            pace = ?self.pace,
            "replay feed started"
        );

        let mut pushed = 0_u64;
        for tick in ticks {
            if shutdown.is_cancelled() {
                break;
            }

            sink.send(tick);
            pushed += 1;
            metrics::record_tick_ingested(metrics::FeedKind::Replay);

            if !self.pace.is_zero() {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(self.pace) => {}
                }
            }
        }

        tracing::info!(pushed, "replay feed finished");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::domain::series::SeriesBuffer;

    use super::*;

    #[tokio::test]
    async fn replays_a_record_file_into_the_buffer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"timestamp": 1700000000, "open": 99.0, "high": 101.0, "low": 98.0,
                  "close": 100.0, "volume": 10, "fluctuation_rate": 0.4}},
                {{"timestamp": 1700000001, "close": "bogus", "volume": 5}}
            ]"#
        )
        .unwrap();

        let (mut buffer, sender) = SeriesBuffer::with_capacity(100);
        let feed = Box::new(ReplayFeed::new(file.path(), Duration::ZERO));
        feed.run(sender, CancellationToken::new()).await.unwrap();

        let snapshot = buffer.flush(None);
        assert_eq!(snapshot.len(), 2);
        assert!((snapshot.get(0).unwrap().close - 100.0).abs() < f64::EPSILON);
        // The bogus close coerced to zero rather than dropping the record.
        assert!((snapshot.get(1).unwrap().close - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn missing_file_surfaces_an_io_error() {
        let (_buffer, sender) = SeriesBuffer::with_capacity(8);
        let feed = Box::new(ReplayFeed::new("/nonexistent/ticks.json", Duration::ZERO));

        let result = feed.run(sender, CancellationToken::new()).await;
        assert!(matches!(result, Err(FeedError::Io(_))));
    }

    #[tokio::test]
    async fn non_array_payload_surfaces_a_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"not": "an array"}}"#).unwrap();

        let (_buffer, sender) = SeriesBuffer::with_capacity(8);
        let feed = Box::new(ReplayFeed::new(file.path(), Duration::ZERO));

        let result = feed.run(sender, CancellationToken::new()).await;
        assert!(matches!(result, Err(FeedError::Decode(_))));
    }
}
