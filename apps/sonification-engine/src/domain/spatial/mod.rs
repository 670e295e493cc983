//! Price-to-Space Coordinate Mapping
//!
//! Pure translation from a coalesced price [`Snapshot`] into the ordered
//! sequence of [`SpherePoint`]s that drives the spatial audio engine.
//!
//! # Geometry
//!
//! The listener sits at the origin facing forward (negative z). Buckets
//! sweep through the frontal semicircle from the listener's left (oldest)
//! to their right (newest); elevation encodes the close price normalized
//! against the snapshot's price range, and radius encodes traded volume.
//! The resulting vector is clamped to `max_radius`, scaled down toward the
//! origin without changing direction.

use crate::domain::series::Snapshot;

/// Hard cap on the distance of any mapped point from the listener.
pub const MAX_RADIUS: f64 = 1.5;

/// Radius assigned to a zero-volume bucket.
pub const BASE_RADIUS: f64 = 0.6;

/// Tone frequency at mid elevation (flat price), in hertz.
pub const BASE_FREQUENCY_HZ: f64 = 440.0;

// =============================================================================
// Sphere Points
// =============================================================================

/// A 3D listening-space position plus tone frequency, derived 1:1 from a
/// bucket.
///
/// Axes: x lateral (positive right), y vertical, z depth (negative in
/// front of the listener). Invariant: `sqrt(x² + y² + z²) <= MAX_RADIUS`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpherePoint {
    /// Lateral offset.
    pub x: f64,
    /// Vertical offset (elevation).
    pub y: f64,
    /// Depth offset.
    pub z: f64,
    /// Tone frequency in hertz, always positive.
    pub freq: f64,
    /// Index of the originating bucket within the snapshot.
    pub source_index: usize,
}

impl SpherePoint {
    /// Distance from the listener.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Tone frequency for a normalized elevation: `440 · 2^elevation`.
///
/// Strictly increasing in elevation and positive for any finite input;
/// elevation 0 lands exactly on A4.
#[must_use]
pub fn frequency_for_elevation(elevation: f64) -> f64 {
    BASE_FREQUENCY_HZ * elevation.exp2()
}

// =============================================================================
// Sphere Mapper
// =============================================================================

/// Pure snapshot-to-points mapper.
///
/// Deterministic and side-effect free: the same snapshot always maps to the
/// same point sequence.
#[derive(Debug, Clone, Copy)]
pub struct SphereMapper {
    /// Distance cap applied after projection.
    pub max_radius: f64,
    /// Radius floor for zero-volume buckets.
    pub base_radius: f64,
}

impl Default for SphereMapper {
    fn default() -> Self {
        Self {
            max_radius: MAX_RADIUS,
            base_radius: BASE_RADIUS,
        }
    }
}

impl SphereMapper {
    /// Map a snapshot to its ordered point sequence.
    ///
    /// An empty snapshot maps to an empty sequence.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn map(&self, snapshot: &Snapshot) -> Vec<SpherePoint> {
        let buckets = snapshot.buckets();
        if buckets.is_empty() {
            return Vec::new();
        }

        let (min_close, max_close) = buckets.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), bucket| (min.min(bucket.close), max.max(bucket.close)),
        );
        let price_range = max_close - min_close;
        let max_volume = buckets
            .iter()
            .fold(0.0_f64, |max, bucket| max.max(bucket.volume));

        // Index 0 maps to the listener's far left, the newest bucket to the
        // far right; a single bucket lands straight ahead.
        let angle_span = (buckets.len().saturating_sub(1)).max(1) as f64;

        buckets
            .iter()
            .enumerate()
            .map(|(i, bucket)| {
                let price_norm = if price_range > 0.0 {
                    (bucket.close - min_close) / price_range
                } else {
                    0.5
                };
                let elevation = 2.0 * price_norm - 1.0;

                let volume_norm = if max_volume > 0.0 {
                    bucket.volume / max_volume
                } else {
                    0.0
                };
                let radius =
                    self.base_radius + volume_norm * (self.max_radius - self.base_radius);

                let theta = std::f64::consts::PI * (i as f64 / angle_span)
                    - std::f64::consts::FRAC_PI_2;

                let point = SpherePoint {
                    x: radius * theta.sin(),
                    y: elevation,
                    z: -radius * theta.cos(),
                    freq: frequency_for_elevation(elevation),
                    source_index: i,
                };

                self.clamp_to_radius(point)
            })
            .collect()
    }

    /// Scale a point down onto the listening sphere if it lies outside.
    ///
    /// Direction is preserved; points inside the sphere are untouched. A
    /// zero-magnitude vector divides by the fallback divisor 1 instead of
    /// its own length.
    fn clamp_to_radius(&self, mut point: SpherePoint) -> SpherePoint {
        let magnitude = point.magnitude();
        if magnitude > self.max_radius {
            let divisor = if magnitude > 0.0 { magnitude } else { 1.0 };
            let scale = self.max_radius / divisor;
            point.x *= scale;
            point.y *= scale;
            point.z *= scale;
        }
        point
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use proptest::prelude::*;

    use crate::domain::series::{SeriesBuffer, Tick};

    use super::*;

    fn snapshot_of(rows: &[(i64, f64, f64)]) -> Snapshot {
        let (mut buffer, sender) = SeriesBuffer::with_capacity(500);
        for &(secs, close, volume) in rows {
            sender.send(Tick {
                time: DateTime::from_timestamp(secs, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume,
                fluctuation_rate: 0.0,
            });
        }
        buffer.flush(None)
    }

    #[test]
    fn empty_snapshot_maps_to_empty_sequence() {
        let points = SphereMapper::default().map(&Snapshot::default());
        assert!(points.is_empty());
    }

    #[test]
    fn flat_price_series_sits_at_base_frequency() {
        let snapshot = snapshot_of(&[(0, 100.0, 1.0), (1, 100.0, 1.0), (2, 100.0, 1.0)]);
        let points = SphereMapper::default().map(&snapshot);

        for point in &points {
            assert!((point.freq - BASE_FREQUENCY_HZ).abs() < 1e-9);
            assert!(point.y.abs() < 1e-9);
        }
    }

    #[test]
    fn frequency_spans_one_octave_around_a4() {
        let snapshot = snapshot_of(&[(0, 50.0, 1.0), (1, 100.0, 1.0), (2, 150.0, 1.0)]);
        let points = SphereMapper::default().map(&snapshot);

        assert!((points[0].freq - 220.0).abs() < 1e-9);
        assert!((points[1].freq - 440.0).abs() < 1e-9);
        assert!((points[2].freq - 880.0).abs() < 1e-9);
    }

    #[test]
    fn frequency_is_strictly_increasing_in_elevation() {
        let mut previous = 0.0;
        for step in -8..=8 {
            let freq = frequency_for_elevation(f64::from(step) * 0.25);
            assert!(freq > previous);
            previous = freq;
        }
        assert!((frequency_for_elevation(0.0) - 440.0).abs() < f64::EPSILON);
    }

    #[test]
    fn time_order_sweeps_left_to_right() {
        let snapshot = snapshot_of(&[(0, 100.0, 1.0), (1, 100.0, 1.0), (2, 100.0, 1.0)]);
        let points = SphereMapper::default().map(&snapshot);

        assert!(points[0].x < 0.0);
        assert!(points[1].x.abs() < 1e-9);
        assert!(points[1].z < 0.0);
        assert!(points[2].x > 0.0);
    }

    #[test]
    fn single_bucket_lands_in_front_within_radius() {
        let snapshot = snapshot_of(&[(0, 100.0, 10.0)]);
        let points = SphereMapper::default().map(&snapshot);

        assert_eq!(points.len(), 1);
        assert!(points[0].x.abs() < 1e-9);
        assert!(points[0].z < 0.0);
        assert!(points[0].magnitude() <= MAX_RADIUS + 1e-9);
    }

    #[test]
    fn clamp_scales_down_preserving_direction() {
        let mapper = SphereMapper::default();
        let outside = SpherePoint {
            x: 3.0,
            y: 4.0,
            z: 0.0,
            freq: 440.0,
            source_index: 0,
        };

        let clamped = mapper.clamp_to_radius(outside);
        assert!((clamped.magnitude() - MAX_RADIUS).abs() < 1e-9);
        // Direction is unchanged: x/y ratio survives the scale.
        assert!((clamped.x / clamped.y - 3.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vector_is_left_alone() {
        let mapper = SphereMapper::default();
        let origin = SpherePoint {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            freq: 440.0,
            source_index: 0,
        };

        let clamped = mapper.clamp_to_radius(origin);
        assert!((clamped.magnitude() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn source_index_tracks_bucket_order() {
        let snapshot = snapshot_of(&[(0, 90.0, 1.0), (1, 110.0, 2.0), (2, 95.0, 3.0)]);
        let points = SphereMapper::default().map(&snapshot);

        let indices: Vec<usize> = points.iter().map(|p| p.source_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    proptest! {
        #[test]
        fn all_points_stay_within_max_radius(
            rows in prop::collection::vec((0_i64..5_000, -1e7_f64..1e7, 0.0_f64..1e9), 1..120),
        ) {
            let snapshot = snapshot_of(&rows);
            let points = SphereMapper::default().map(&snapshot);

            prop_assert_eq!(points.len(), snapshot.len());
            for point in points {
                prop_assert!(point.magnitude() <= MAX_RADIUS + 1e-9);
                prop_assert!(point.freq > 0.0);
            }
        }
    }
}
