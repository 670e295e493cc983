//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `IngestService`: flush cadence between the tick feed and consumers
//! - `SpatialAudioEngine`: the playback sequencer
//! - `ControlService`: UI command handling

/// UI command loop.
pub mod control;

/// Periodic flush between the feed and snapshot consumers.
pub mod ingest;

/// Spatial audio playback sequencing.
pub mod playback;
