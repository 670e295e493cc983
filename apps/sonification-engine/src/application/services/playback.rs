//! Spatial Audio Playback Engine
//!
//! Stateful sequencer that walks a [`SpherePoint`] sequence and drives the
//! audio-graph collaborator with small timed ramps: position, early
//! reflection asymmetry and pre-delay, tone gain, and note triggers.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──ensure_graph──> Ready ──play──> Playing ──complete/stop──> Ready
//!                          │                                          │
//!                          └────────────── dispose <──────────────────┘
//! ```
//!
//! Stop is a signal, not a state: the running session observes the
//! cancellation token at its suspension points and winds down itself.
//!
//! # Ownership
//!
//! The engine exclusively owns the graph cell (node handles + lifecycle
//! flags) and the single active session. Preset parameters are the only
//! state shared with callers during playback; the session loop alone
//! touches position, frequency, and cursor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{AudioGraph, AudioGraphError, GraphParam, IndexObserver};
use crate::domain::externalization::{Preset, PresetName, preset_for};
use crate::domain::spatial::SpherePoint;

/// Speed of sound used for the simulated early-reflection pre-delay.
pub const SPEED_OF_SOUND_MPS: f64 = 343.0;

/// Guard against division by zero in the azimuth approximation.
const AZIMUTH_EPSILON: f64 = 1e-3;

/// Tone gain floor; the tone never fully disappears mid-sequence.
const MIN_TONE_GAIN: f64 = 0.005;

/// Tone gain ceiling.
const MAX_TONE_GAIN: f64 = 1.0;

/// Tone gain before the first step has applied any frequency delta.
const INITIAL_TONE_GAIN: f64 = 0.5;

// =============================================================================
// Settings
// =============================================================================

/// Timing and response parameters for the playback sequencer.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackSettings {
    /// Pause between steps; cancellation is observed around it.
    pub step_interval: Duration,
    /// Window for position and per-step parameter ramps.
    pub position_ramp: Duration,
    /// Window for preset-change ramps.
    pub preset_ramp: Duration,
    /// How long each triggered note sounds.
    pub note_duration: Duration,
    /// Tone-gain change per hertz of frequency delta between steps.
    pub gain_change_speed: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_millis(200),
            position_ramp: Duration::from_millis(60),
            preset_ramp: Duration::from_millis(150),
            note_duration: Duration::from_millis(150),
            gain_change_speed: 0.001,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Engine lifecycle and collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The audio-graph collaborator failed.
    #[error(transparent)]
    Graph(#[from] AudioGraphError),
    /// The requested operation requires an idle engine.
    #[error("a playback session is active")]
    PlaybackActive,
    /// The engine was disposed; graph nodes have been released.
    #[error("engine has been disposed")]
    Disposed,
}

// =============================================================================
// Playback Cursor
// =============================================================================

/// Shared record of the currently sounding point index.
///
/// Written by the index-observer adapter, read by the flush loop to flag
/// the active bucket in each snapshot.
#[derive(Debug, Default)]
pub struct PlaybackCursor(AtomicI64);

/// Sentinel for "nothing sounding".
const CURSOR_IDLE: i64 = -1;

impl PlaybackCursor {
    /// New cursor with nothing sounding.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicI64::new(CURSOR_IDLE))
    }

    /// Record the sounding index (`None` clears it).
    pub fn set(&self, index: Option<usize>) {
        let value = index.and_then(|i| i64::try_from(i).ok()).unwrap_or(CURSOR_IDLE);
        self.0.store(value, Ordering::Relaxed);
    }

    /// The sounding index, if any.
    #[must_use]
    pub fn get(&self) -> Option<usize> {
        usize::try_from(self.0.load(Ordering::Relaxed)).ok()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Graph handle plus lifecycle flags, guarded as one unit so commands never
/// race initialization or disposal.
#[derive(Debug)]
struct GraphCell<G> {
    graph: G,
    initialized: bool,
    disposed: bool,
}

/// Preset parameters shared between control calls and the session loop.
#[derive(Debug)]
struct SharedState {
    playing: AtomicBool,
    session: Mutex<Option<CancellationToken>>,
    preset: Mutex<(PresetName, Preset)>,
    tone_gain: Mutex<f64>,
}

/// The spatial audio playback engine.
///
/// At most one playback session runs at a time; `play` while playing is a
/// no-op. Preset switches mid-playback ramp only preset-owned parameters
/// and never reset the playback position.
pub struct SpatialAudioEngine<G: AudioGraph + 'static> {
    graph: Arc<Mutex<GraphCell<G>>>,
    observer: Arc<dyn IndexObserver>,
    settings: PlaybackSettings,
    shared: Arc<SharedState>,
}

impl<G: AudioGraph + 'static> Clone for SpatialAudioEngine<G> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            observer: Arc::clone(&self.observer),
            settings: self.settings,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G: AudioGraph + 'static> SpatialAudioEngine<G> {
    /// Create an engine over an uninitialized graph.
    ///
    /// The graph is not built until [`ensure_graph`](Self::ensure_graph)
    /// or the first [`play`](Self::play).
    #[must_use]
    pub fn new(graph: G, observer: Arc<dyn IndexObserver>, settings: PlaybackSettings) -> Self {
        Self {
            graph: Arc::new(Mutex::new(GraphCell {
                graph,
                initialized: false,
                disposed: false,
            })),
            observer,
            settings,
            shared: Arc::new(SharedState {
                playing: AtomicBool::new(false),
                session: Mutex::new(None),
                preset: Mutex::new((PresetName::Basic, preset_for(PresetName::Basic))),
                tone_gain: Mutex::new(INITIAL_TONE_GAIN),
            }),
        }
    }

    /// Whether a playback session is currently active.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    /// The preset currently shaping the externalization sends.
    #[must_use]
    pub fn current_preset(&self) -> PresetName {
        self.shared.preset.lock().0
    }

    /// Build the audio graph if it has not been built yet.
    ///
    /// Idempotent: the graph is constructed at most once per engine
    /// lifetime. A failed initialization leaves the engine uninitialized
    /// so the caller may retry explicitly.
    ///
    /// # Errors
    ///
    /// [`EngineError::Disposed`] after [`dispose`](Self::dispose), or the
    /// collaborator's initialization failure.
    pub fn ensure_graph(&self) -> Result<(), EngineError> {
        let mut cell = self.graph.lock();
        if cell.disposed {
            return Err(EngineError::Disposed);
        }
        if !cell.initialized {
            cell.graph.initialize()?;
            cell.initialized = true;
            tracing::info!("audio graph initialized");
        }
        Ok(())
    }

    /// Resolve `name` (unknown names fall back to `basic`) and ramp the
    /// externalization parameters toward it.
    ///
    /// Safe mid-playback: only the early/late sends, EQ shelf, panner
    /// distance, and stored asymmetry change; cursor and triggered
    /// frequencies are untouched.
    ///
    /// # Errors
    ///
    /// Propagates graph initialization or command failures.
    pub fn apply_preset(&self, name: PresetName) -> Result<(), EngineError> {
        self.ensure_graph()?;
        let preset = preset_for(name);

        {
            let mut cell = self.graph.lock();
            let window = self.settings.preset_ramp;
            cell.graph
                .ramp_param(GraphParam::EarlyGainLeft, preset.early_reflection_gain, window)?;
            cell.graph
                .ramp_param(GraphParam::EarlyGainRight, preset.early_reflection_gain, window)?;
            cell.graph
                .ramp_param(GraphParam::LateReverbGain, preset.late_reverb_gain, window)?;
            cell.graph
                .ramp_param(GraphParam::HighShelfDb, preset.high_shelf_db, window)?;
            cell.graph
                .ramp_param(GraphParam::PannerDistance, preset.distance, window)?;
        }

        *self.shared.preset.lock() = (name, preset);
        tracing::info!(preset = %name, "externalization preset applied");
        Ok(())
    }

    /// Start a playback session over `points`.
    ///
    /// No-op when already playing. An empty sequence completes
    /// immediately, reporting "nothing sounding" to the observer without
    /// touching the graph.
    ///
    /// # Errors
    ///
    /// Graph initialization failure; surfaced once, the caller may retry.
    pub fn play(&self, points: Vec<SpherePoint>) -> Result<(), EngineError> {
        if self.shared.playing.swap(true, Ordering::SeqCst) {
            tracing::debug!("play ignored: session already active");
            return Ok(());
        }

        if points.is_empty() {
            self.shared.playing.store(false, Ordering::SeqCst);
            self.observer.on_index_changed(None);
            return Ok(());
        }

        if let Err(e) = self.ensure_graph() {
            self.shared.playing.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let token = CancellationToken::new();
        *self.shared.session.lock() = Some(token.clone());

        tracing::info!(points = points.len(), "playback session started");
        tokio::spawn(Session {
            graph: Arc::clone(&self.graph),
            observer: Arc::clone(&self.observer),
            settings: self.settings,
            shared: Arc::clone(&self.shared),
            points,
            token,
        }
        .run());

        Ok(())
    }

    /// Signal the active session to abort and release the sounding note.
    ///
    /// Parameters stay at their last ramped values; the graph is kept so
    /// playback can resume cheaply.
    pub fn stop(&self) {
        if let Some(token) = self.shared.session.lock().as_ref() {
            token.cancel();
            tracing::info!("playback stop requested");
        }

        let mut cell = self.graph.lock();
        if cell.initialized
            && let Err(e) = cell.graph.release_note()
        {
            tracing::warn!(error = %e, "failed to release note on stop");
        }
    }

    /// Release all graph nodes.
    ///
    /// # Errors
    ///
    /// [`EngineError::PlaybackActive`] while a session is running — the
    /// session must finish or be stopped first so no in-flight ramp can
    /// reference released nodes.
    pub fn dispose(&self) -> Result<(), EngineError> {
        if self.shared.playing.load(Ordering::SeqCst) {
            return Err(EngineError::PlaybackActive);
        }

        let mut cell = self.graph.lock();
        if cell.disposed {
            return Ok(());
        }
        if cell.initialized {
            cell.graph.dispose()?;
            cell.initialized = false;
        }
        cell.disposed = true;
        tracing::info!("audio graph disposed");
        Ok(())
    }
}

// =============================================================================
// Session
// =============================================================================

/// One cooperative playback pass over a point sequence.
struct Session<G: AudioGraph> {
    graph: Arc<Mutex<GraphCell<G>>>,
    observer: Arc<dyn IndexObserver>,
    settings: PlaybackSettings,
    shared: Arc<SharedState>,
    points: Vec<SpherePoint>,
    token: CancellationToken,
}

impl<G: AudioGraph> Session<G> {
    async fn run(self) {
        let mut previous_freq = self.points[0].freq;

        for (cursor, point) in self.points.iter().enumerate() {
            if self.token.is_cancelled() {
                break;
            }

            self.observer.on_index_changed(Some(cursor));

            if let Err(e) = self.step(point, &mut previous_freq) {
                tracing::warn!(error = %e, cursor, "audio step failed; aborting session");
                break;
            }

            // The only suspension point; a stop request lands within one
            // step either here or at the check above.
            tokio::select! {
                () = self.token.cancelled() => {}
                () = tokio::time::sleep(self.settings.step_interval) => {}
            }
        }

        self.observer.on_index_changed(None);

        {
            let mut cell = self.graph.lock();
            if cell.initialized
                && let Err(e) = cell.graph.release_note()
            {
                tracing::debug!(error = %e, "failed to release note at session end");
            }
        }

        *self.shared.session.lock() = None;
        self.shared.playing.store(false, Ordering::SeqCst);
        tracing::info!("playback session ended");
    }

    /// Issue all graph writes for one point.
    fn step(&self, point: &SpherePoint, previous_freq: &mut f64) -> Result<(), AudioGraphError> {
        let (_, preset) = *self.shared.preset.lock();
        let window = self.settings.position_ramp;
        let mut cell = self.graph.lock();

        cell.graph.ramp_position(point.x, point.y, point.z, window)?;

        let distance = point.magnitude() * preset.distance;
        cell.graph.ramp_param(
            GraphParam::EarlyPredelaySeconds,
            distance / SPEED_OF_SOUND_MPS,
            window,
        )?;

        let azimuth = azimuth_of(point);
        cell.graph.ramp_param(
            GraphParam::EarlyGainLeft,
            preset.early_reflection_gain * (1.0 - preset.asymmetry_scale * azimuth),
            window,
        )?;
        cell.graph.ramp_param(
            GraphParam::EarlyGainRight,
            preset.early_reflection_gain * (1.0 + preset.asymmetry_scale * azimuth),
            window,
        )?;

        let gain = {
            let mut tone_gain = self.shared.tone_gain.lock();
            *tone_gain = next_tone_gain(
                *tone_gain,
                point.freq - *previous_freq,
                self.settings.gain_change_speed,
            );
            *tone_gain
        };
        cell.graph.ramp_param(GraphParam::ToneGain, gain, window)?;

        cell.graph.trigger_note(point.freq, self.settings.note_duration)?;
        *previous_freq = point.freq;
        Ok(())
    }
}

/// Lateral/forward ratio clamped to [-1, 1].
///
/// A heuristic, not a geometric azimuth; its shape is kept for
/// compatibility with the coordinate convention.
fn azimuth_of(point: &SpherePoint) -> f64 {
    (point.x / (point.z.abs() + AZIMUTH_EPSILON)).clamp(-1.0, 1.0)
}

/// Tone gain follows relative frequency change, clamped to the audible
/// band; a flat sequence holds a stable loudness.
fn next_tone_gain(current: f64, freq_delta: f64, speed: f64) -> f64 {
    (current + freq_delta * speed).clamp(MIN_TONE_GAIN, MAX_TONE_GAIN)
}

// =============================================================================
// Tests
// =============================================================================
