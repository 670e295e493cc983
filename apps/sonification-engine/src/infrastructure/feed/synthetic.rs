//! Synthetic Tick Generator
//!
//! Random-walk price feed for demos and soak runs: bursty by design so the
//! coalescing buffer sees same-second ticks, out-of-order arrival, and
//! volume accumulation the way a real transport delivers them.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FeedError, TickSource};
use crate::domain::series::{Tick, TickSender};
use crate::infrastructure::metrics;

/// Tuning for the random walk.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticFeedConfig {
    /// Delay between emitted ticks.
    pub tick_interval: Duration,
    /// Price at the first tick.
    pub start_price: f64,
    /// Largest absolute per-tick price move.
    pub max_step: f64,
    /// Largest per-tick volume.
    pub max_volume: f64,
}

impl Default for SyntheticFeedConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            start_price: 100.0,
            max_step: 0.8,
            max_volume: 500.0,
        }
    }
}

/// Random-walk implementation of the tick source port.
#[derive(Debug, Default)]
pub struct SyntheticFeed {
    config: SyntheticFeedConfig,
}

impl SyntheticFeed {
    /// Create a generator with the given tuning.
    #[must_use]
    pub const fn new(config: SyntheticFeedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TickSource for SyntheticFeed {
    async fn run(
        self: Box<Self>,
        sink: TickSender,
        shutdown: CancellationToken,
    ) -> Result<(), FeedError> {
        let mut rng = StdRng::from_os_rng();
        let mut price = self.config.start_price;
        let mut previous_close = price;
        tracing::info!(
            interval = ?self.config.tick_interval,
            start_price = price,
            "synthetic feed started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let step = rng.random_range(-self.config.max_step..=self.config.max_step);
            let open = price;
            price = (price + step).max(0.01);
            let high = open.max(price) + rng.random_range(0.0..self.config.max_step / 2.0);
            let low = (open.min(price) - rng.random_range(0.0..self.config.max_step / 2.0))
                .max(0.01);
            let fluctuation_rate = if previous_close > 0.0 {
                (price - previous_close) / previous_close * 100.0
            } else {
                0.0
            };
            previous_close = price;

            sink.send(Tick {
                time: Utc::now(),
                open,
                high,
                low,
                close: price,
                volume: rng.random_range(0.0..self.config.max_volume),
                fluctuation_rate,
            });
            metrics::record_tick_ingested(metrics::FeedKind::Synthetic);

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.config.tick_interval) => {}
            }
        }

        tracing::info!("synthetic feed stopped");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::domain::series::SeriesBuffer;
    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn generates_ticks_until_shutdown() {
        let (mut buffer, sender) = SeriesBuffer::with_capacity(100);
        let shutdown = CancellationToken::new();
        let feed = Box::new(SyntheticFeed::new(SyntheticFeedConfig {
            tick_interval: Duration::from_millis(100),
            ..SyntheticFeedConfig::default()
        }));

        let handle = tokio::spawn(feed.run(sender, shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        shutdown.cancel();
        tokio_test::assert_ok!(handle.await.unwrap());

        // Paused-time ticks share a wall-clock second, so they coalesce;
        // the walk still produced positive accumulated volume.
        let snapshot = buffer.flush(None);
        assert!(!snapshot.is_empty());
        assert!(snapshot.buckets().iter().all(|b| b.volume >= 0.0));
        assert!(snapshot.buckets().iter().all(|b| b.close > 0.0));
    }
}
