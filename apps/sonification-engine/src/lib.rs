#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Sonification Engine - Market Data Spatial Audio
//!
//! Turns a price tick stream into a bounded chart-ready series and a
//! spatial-audio playback sequence, so price movement is heard as motion
//! around a listener.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core sonification logic and data types
//!   - `series`: tick coalescing into bounded, ordered snapshots
//!   - `spatial`: price/time to listening-space coordinate mapping
//!   - `externalization`: out-of-head presets for the spatialized tone
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: interfaces for the audio, chart, and feed collaborators
//!   - `services`: ingest cadence, playback sequencing, UI control
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `feed`: replay and synthetic tick sources
//!   - `audio`: channel and tracing sinks for audio-graph commands
//!   - `broadcast`: snapshot and playback-index fan-out
//!   - `config`: environment configuration
//!
//! # Data Flow
//!
//! ```text
//! tick feed ──┐
//!             │     ┌──────────────┐      ┌──────────────┐
//!             ├────►│ SeriesBuffer │─────►│ SnapshotHub  │──► chart client(s)
//! bulk replay─┘     │  (coalesce)  │      └──────────────┘
//!                   └──────┬───────┘
//!                          │ SphereMapper
//!                          ▼
//!                   ┌──────────────┐      ┌──────────────┐
//!                   │ SpatialAudio │─────►│ audio graph  │──► renderer
//!                   │    Engine    │      │   commands   │
//!                   └──────────────┘      └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core sonification types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::externalization::{Preset, PresetName, preset_for};
pub use domain::series::{Bucket, SeriesBuffer, Snapshot, Tick, TickSender, TimeKey};
pub use domain::spatial::{MAX_RADIUS, SphereMapper, SpherePoint};

// Ports
pub use application::ports::{
    AudioGraph, AudioGraphError, FeedError, GraphParam, IndexObserver, SnapshotSink, TickSource,
};

// Services
pub use application::services::control::{ControlCommand, ControlService};
pub use application::services::ingest::{IngestService, SharedPoints};
pub use application::services::playback::{
    EngineError, PlaybackCursor, PlaybackSettings, SpatialAudioEngine,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, EngineConfig, FeedSelection};

// Broadcast hub (for integration tests)
pub use infrastructure::broadcast::{
    HubConfig, HubIndexObserver, HubStats, IndexUpdate, SharedSnapshotHub, SnapshotHub,
};

// Audio adapters (for integration tests)
pub use infrastructure::audio::{AudioCommand, ChannelAudioGraph, TracingAudioGraph};

// Feed adapters
pub use infrastructure::feed::{ReplayFeed, SyntheticFeed, SyntheticFeedConfig};

// Metrics
pub use infrastructure::metrics::{FeedKind as MetricsFeedKind, init_metrics};

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
