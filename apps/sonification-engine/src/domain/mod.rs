//! Domain Layer
//!
//! Core sonification types and logic with no infrastructure dependencies.

/// Externalization presets for the spatialized tone.
pub mod externalization;

/// Tick coalescing: buckets, snapshots, and the series buffer.
pub mod series;

/// Price/time to listening-space coordinate mapping.
pub mod spatial;
