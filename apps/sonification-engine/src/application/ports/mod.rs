//! Port Interfaces
//!
//! Interfaces (ports) for external collaborators following the Hexagonal
//! Architecture pattern. These are the contracts infrastructure adapters
//! implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`AudioGraph`]: the opaque audio-output capability the engine
//!   configures and sequences — the only writes performed against it
//! - [`IndexObserver`]: playback-position notifications for the chart
//!   collaborator
//! - [`SnapshotSink`]: flushed snapshots on their way to the chart
//!   collaborator
//!
//! ## Driver Ports (Inbound)
//!
//! - [`TickSource`]: feed adapters pushing ticks into the series buffer

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::series::{Snapshot, TickSender};

// =============================================================================
// Audio Graph Port
// =============================================================================

/// Graph parameters the engine ramps. Each corresponds to one node handle
/// owned by the adapter once the graph is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphParam {
    /// Gain of the tone source feeding the panner.
    ToneGain,
    /// Left early-reflection send gain.
    EarlyGainLeft,
    /// Right early-reflection send gain.
    EarlyGainRight,
    /// Early-reflection pre-delay, in seconds.
    EarlyPredelaySeconds,
    /// Late-reverb send gain.
    LateReverbGain,
    /// High-shelf EQ gain, in dB.
    HighShelfDb,
    /// Panner distance parameter.
    PannerDistance,
}

impl GraphParam {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ToneGain => "tone_gain",
            Self::EarlyGainLeft => "early_gain_left",
            Self::EarlyGainRight => "early_gain_right",
            Self::EarlyPredelaySeconds => "early_predelay_seconds",
            Self::LateReverbGain => "late_reverb_gain",
            Self::HighShelfDb => "high_shelf_db",
            Self::PannerDistance => "panner_distance",
        }
    }
}

/// Error surfaced by the audio-output collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AudioGraphError {
    /// The graph could not be built (for example, no output device).
    #[error("audio graph initialization failed: {reason}")]
    InitFailed {
        /// Adapter-specific failure description.
        reason: String,
    },
    /// A command was issued before the graph was built.
    #[error("audio graph is not initialized")]
    NotInitialized,
    /// The collaborator consuming graph commands has gone away.
    #[error("audio output collaborator disconnected")]
    Disconnected,
}

/// The opaque audio-graph capability.
///
/// `initialize` builds the fixed topology (tone source → tone gain →
/// spatial panner → mix bus, plus early-reflection and late-reverb sends
/// into the mix bus) and sets the listener orientation to the default:
/// listener at the origin, facing forward. All subsequent writes are
/// parameter ramps, position ramps, and note triggers; nothing else is
/// ever issued against the collaborator.
///
/// Ramps are smooth timed transitions — adapters must not jump
/// discontinuously to the target value.
#[cfg_attr(test, mockall::automock)]
pub trait AudioGraph: Send {
    /// Build the graph and set the default listener orientation.
    ///
    /// # Errors
    ///
    /// Returns [`AudioGraphError::InitFailed`] when the output device is
    /// unavailable. Callers may retry explicitly; the port itself does not.
    fn initialize(&mut self) -> Result<(), AudioGraphError>;

    /// Ramp one graph parameter to `value` over `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph is uninitialized or the collaborator
    /// is gone.
    fn ramp_param(
        &mut self,
        param: GraphParam,
        value: f64,
        window: Duration,
    ) -> Result<(), AudioGraphError>;

    /// Ramp the panner's 3D position toward `(x, y, z)` over `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph is uninitialized or the collaborator
    /// is gone.
    fn ramp_position(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        window: Duration,
    ) -> Result<(), AudioGraphError>;

    /// Trigger the tone at `frequency_hz` for `duration`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph is uninitialized or the collaborator
    /// is gone.
    fn trigger_note(
        &mut self,
        frequency_hz: f64,
        duration: Duration,
    ) -> Result<(), AudioGraphError>;

    /// Release the currently sounding note, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator is gone.
    fn release_note(&mut self) -> Result<(), AudioGraphError>;

    /// Release all graph nodes.
    ///
    /// Only called when no ramp is in flight; the engine guarantees no
    /// playback session is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator is gone.
    fn dispose(&mut self) -> Result<(), AudioGraphError>;
}

// =============================================================================
// Index Observer Port
// =============================================================================

/// Receives the currently sounding point index on every playback step, and
/// `None` on completion or abort.
#[cfg_attr(test, mockall::automock)]
pub trait IndexObserver: Send + Sync {
    /// Playback moved to `index` (`None` = nothing sounding).
    fn on_index_changed(&self, index: Option<usize>);
}

// =============================================================================
// Snapshot Sink Port
// =============================================================================

/// Receives each flushed snapshot, once per flush cadence.
///
/// Publishing must not block the flush loop; slow consumers are the
/// adapter's concern.
pub trait SnapshotSink: Send + Sync {
    /// Publish one snapshot to downstream consumers.
    fn publish(&self, snapshot: Snapshot);
}

// =============================================================================
// Tick Source Port
// =============================================================================

/// Error surfaced by a feed adapter. Fatal to that adapter only; the
/// series buffer and engine are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Reading the source failed.
    #[error("feed i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The source payload was not a tick record array.
    #[error("feed decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A source of ticks: the live transport or a bulk historical loader.
///
/// Implementations push through the sink until exhausted or shut down.
#[async_trait]
pub trait TickSource: Send {
    /// Run the feed until completion or cancellation.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] when the source cannot be read or decoded.
    async fn run(
        self: Box<Self>,
        sink: TickSender,
        shutdown: CancellationToken,
    ) -> Result<(), FeedError>;
}
