//! Price Series Coalescing
//!
//! Core domain types for the tick time-series: raw ticks, time-keyed
//! buckets, bounded snapshots, and the `SeriesBuffer` that merges a bursty
//! tick stream into a chart-ready series.
//!
//! # Design
//!
//! Producers push ticks through a cloneable [`TickSender`] at arbitrary
//! rate; the send never blocks. The [`SeriesBuffer`] drains the pending
//! queue on each flush, merges ticks into buckets keyed by whole-second
//! time keys, and emits a bounded, time-ordered [`Snapshot`]:
//!
//! ```text
//! feed adapters ──> TickSender ──> pending queue ──> flush() ──> Snapshot
//! ```
//!
//! Malformed numeric fields are coerced at ingestion (never rejected), so
//! flushing is infallible.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// =============================================================================
// Time Keys
// =============================================================================

/// Discrete coalescing key: the tick timestamp truncated to whole seconds.
///
/// Two ticks sharing a key merge into one bucket. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeKey(i64);

impl TimeKey {
    /// Build a key from a timestamp, truncating to whole seconds.
    #[must_use]
    pub fn from_timestamp(time: DateTime<Utc>) -> Self {
        Self(time.timestamp())
    }

    /// Epoch seconds backing this key.
    #[must_use]
    pub const fn as_secs(&self) -> i64 {
        self.0
    }
}

impl From<DateTime<Utc>> for TimeKey {
    fn from(time: DateTime<Utc>) -> Self {
        Self::from_timestamp(time)
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp(self.0, 0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}", self.0),
        }
    }
}

// =============================================================================
// Ticks
// =============================================================================

/// One raw price/volume observation from the feed.
///
/// This is the flat wire shape pushed by the live transport or the bulk
/// loader. Decoding is lenient: absent, null, or non-numeric fields coerce
/// to zero rather than rejecting the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Observation timestamp (epoch seconds or millis, or RFC 3339 on the wire).
    #[serde(alias = "timestamp", default = "epoch", deserialize_with = "lenient_time")]
    pub time: DateTime<Utc>,
    /// Opening price for the observation interval.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open: f64,
    /// Highest traded price.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub high: f64,
    /// Lowest traded price.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub low: f64,
    /// Closing (last) price.
    #[serde(alias = "price", default, deserialize_with = "lenient_f64")]
    pub close: f64,
    /// Traded volume, non-negative.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: f64,
    /// Percentage change versus the prior close.
    #[serde(
        alias = "fluctuationRate",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub fluctuation_rate: f64,
}

impl Tick {
    /// The coalescing key for this tick.
    #[must_use]
    pub fn time_key(&self) -> TimeKey {
        TimeKey::from_timestamp(self.time)
    }

    /// Replace non-finite fields with zero and clamp volume to >= 0.
    ///
    /// Deserialization already coerces non-numeric wire values; this covers
    /// ticks constructed in-process (NaN/infinity from upstream math).
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.open = finite_or_zero(self.open);
        self.high = finite_or_zero(self.high);
        self.low = finite_or_zero(self.low);
        self.close = finite_or_zero(self.close);
        self.volume = finite_or_zero(self.volume).max(0.0);
        self.fluctuation_rate = finite_or_zero(self.fluctuation_rate);
        self
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

const fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

// =============================================================================
// Buckets and Snapshots
// =============================================================================

/// A tick merged into the series, unique per [`TimeKey`].
///
/// Re-observations of the same key overwrite the price fields and
/// accumulate volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// Coalescing key (whole-second granularity).
    pub key: TimeKey,
    /// Timestamp of the most recent tick merged into this bucket.
    pub time: DateTime<Utc>,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Accumulated volume across merged ticks.
    pub volume: f64,
    /// Percentage change versus the prior close.
    pub fluctuation_rate: f64,
    /// Whether this bucket is the currently sounding playback position.
    pub active: bool,
}

impl Bucket {
    fn from_tick(tick: &Tick) -> Self {
        Self {
            key: tick.time_key(),
            time: tick.time,
            open: tick.open,
            high: tick.high,
            low: tick.low,
            close: tick.close,
            volume: tick.volume.max(0.0),
            fluctuation_rate: tick.fluctuation_rate,
            active: false,
        }
    }

    /// Merge a same-key tick: prices follow the newer tick, volume adds.
    fn absorb(&mut self, tick: &Tick) {
        self.time = tick.time;
        self.open = tick.open;
        self.high = tick.high;
        self.low = tick.low;
        self.close = tick.close;
        self.volume += tick.volume.max(0.0);
        self.fluctuation_rate = tick.fluctuation_rate;
    }
}

/// Bounded, time-ordered, de-duplicated series handed to downstream
/// consumers (chart collaborator and coordinate mapper).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    buckets: Vec<Bucket>,
}

impl Snapshot {
    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the snapshot holds no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The buckets, ascending by time key.
    #[must_use]
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Bucket at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    /// Index of the bucket flagged active, if any.
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.buckets.iter().position(|b| b.active)
    }
}

// =============================================================================
// Tick Sender
// =============================================================================

/// Cloneable, non-blocking push handle for feed adapters.
///
/// Sends are O(1) and never block or fail from the caller's perspective;
/// ticks pushed after the buffer is dropped are silently discarded.
#[derive(Debug, Clone)]
pub struct TickSender {
    tx: mpsc::UnboundedSender<Tick>,
}

impl TickSender {
    /// Push one tick into the pending queue.
    pub fn send(&self, tick: Tick) {
        let _ = self.tx.send(tick.sanitized());
    }
}

// =============================================================================
// Series Buffer
// =============================================================================

/// Merge/coalesce engine between the tick feed and snapshot consumers.
///
/// Owns snapshot construction exclusively: producers only ever touch the
/// pending queue, and `flush` is the single consumer that drains it.
///
/// # Example
///
/// ```rust
/// use sonification_engine::domain::series::SeriesBuffer;
///
/// let (mut buffer, sender) = SeriesBuffer::with_capacity(100);
/// // feed adapters clone `sender` and push ticks...
/// let snapshot = buffer.flush(None);
/// assert!(snapshot.is_empty());
/// ```
#[derive(Debug)]
pub struct SeriesBuffer {
    rx: mpsc::UnboundedReceiver<Tick>,
    buckets: BTreeMap<TimeKey, Bucket>,
    capacity: usize,
}

impl SeriesBuffer {
    /// Create a buffer retaining at most `capacity` buckets, plus its
    /// push handle.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, TickSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx,
                buckets: BTreeMap::new(),
                capacity: capacity.max(1),
            },
            TickSender { tx },
        )
    }

    /// Number of buckets currently retained.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.buckets.len()
    }

    /// Drain pending ticks, merge, truncate, and emit the new snapshot.
    ///
    /// `active_index` flags at most one bucket as the currently sounding
    /// playback position; any previous flag is cleared. Ticks arriving
    /// concurrently with the drain land in the next flush — none are lost
    /// or applied twice.
    pub fn flush(&mut self, active_index: Option<usize>) -> Snapshot {
        let mut drained = 0_u64;
        while let Ok(tick) = self.rx.try_recv() {
            self.merge(&tick);
            drained += 1;
        }

        // Bounded retention: drop the oldest keys first.
        while self.buckets.len() > self.capacity {
            self.buckets.pop_first();
        }

        let mut buckets: Vec<Bucket> = self.buckets.values().cloned().collect();
        for (i, bucket) in buckets.iter_mut().enumerate() {
            bucket.active = active_index == Some(i);
        }

        if drained > 0 {
            tracing::debug!(drained, depth = buckets.len(), "series flush");
        }

        Snapshot { buckets }
    }

    fn merge(&mut self, tick: &Tick) {
        match self.buckets.get_mut(&tick.time_key()) {
            Some(bucket) => bucket.absorb(tick),
            None => {
                self.buckets.insert(tick.time_key(), Bucket::from_tick(tick));
            }
        }
    }
}

// =============================================================================
// Lenient Deserializers
// =============================================================================

/// Deserialize any scalar as `f64`, coercing everything non-numeric to 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientF64;

    impl<'de> Visitor<'de> for LenientF64 {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number, or any value to coerce to 0")
        }

        fn visit_f64<E>(self, v: f64) -> Result<f64, E> {
            Ok(finite_or_zero(v))
        }

        #[allow(clippy::cast_precision_loss)]
        fn visit_i64<E>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        #[allow(clippy::cast_precision_loss)]
        fn visit_u64<E>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E>(self, v: &str) -> Result<f64, E> {
            Ok(v.parse::<f64>().map_or(0.0, finite_or_zero))
        }

        fn visit_bool<E>(self, _: bool) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_unit<E>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_none<E>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<f64, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(LenientF64)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<f64, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(0.0)
        }

        fn visit_map<A>(self, mut map: A) -> Result<f64, A::Error>
        where
            A: MapAccess<'de>,
        {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(LenientF64)
}

/// Deserialize a timestamp from epoch seconds, epoch millis, or RFC 3339;
/// anything unparseable coerces to the Unix epoch.
fn lenient_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    /// Values at or above this are read as epoch milliseconds.
    const MILLIS_CUTOVER: i64 = 100_000_000_000;

    struct LenientTime;

    impl LenientTime {
        fn from_epoch(v: i64) -> DateTime<Utc> {
            let parsed = if v.abs() >= MILLIS_CUTOVER {
                DateTime::<Utc>::from_timestamp_millis(v)
            } else {
                DateTime::<Utc>::from_timestamp(v, 0)
            };
            parsed.unwrap_or(DateTime::UNIX_EPOCH)
        }
    }

    impl<'de> Visitor<'de> for LenientTime {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an epoch timestamp or RFC 3339 string")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Self::from_epoch(v))
        }

        #[allow(clippy::cast_possible_wrap)]
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Self::from_epoch(v as i64))
        }

        #[allow(clippy::cast_possible_truncation)]
        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            if v.is_finite() {
                Ok(Self::from_epoch(v as i64))
            } else {
                Ok(DateTime::UNIX_EPOCH)
            }
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
                return Ok(dt.with_timezone(&Utc));
            }
            Ok(v.parse::<i64>().map_or(DateTime::UNIX_EPOCH, Self::from_epoch))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(DateTime::UNIX_EPOCH)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(DateTime::UNIX_EPOCH)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(LenientTime)
        }
    }

    deserializer.deserialize_any(LenientTime)
}

// =============================================================================
// Tests
// =============================================================================
