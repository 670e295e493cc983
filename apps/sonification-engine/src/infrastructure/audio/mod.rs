//! Audio Graph Adapters
//!
//! The engine only ever issues typed commands against the audio-output
//! collaborator; these adapters carry them across the boundary. The actual
//! oscillator/filter/reverb primitives live on the other side.
//!
//! - [`ChannelAudioGraph`]: forwards commands over an mpsc channel to an
//!   attached renderer (or a test asserting on the sequence)
//! - [`TracingAudioGraph`]: structured-log sink, the binary's default when
//!   no renderer is attached

use std::time::Duration;

use tokio::sync::mpsc;

use crate::application::ports::{AudioGraph, AudioGraphError, GraphParam};

// =============================================================================
// Commands
// =============================================================================

/// One write against the audio-output collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    /// Build the fixed topology and set the default listener orientation.
    InitializeGraph,
    /// Smoothly ramp one parameter to a target value.
    RampParam {
        /// The parameter to ramp.
        param: GraphParam,
        /// Target value.
        value: f64,
        /// Ramp window.
        window: Duration,
    },
    /// Smoothly ramp the panner position.
    RampPosition {
        /// Lateral target (positive right).
        x: f64,
        /// Vertical target.
        y: f64,
        /// Depth target (negative in front).
        z: f64,
        /// Ramp window.
        window: Duration,
    },
    /// Sound the tone.
    TriggerNote {
        /// Tone frequency in hertz.
        frequency_hz: f64,
        /// Note length.
        duration: Duration,
    },
    /// Release the sounding tone.
    ReleaseNote,
    /// Release all graph nodes.
    DisposeGraph,
}

// =============================================================================
// Channel Adapter
// =============================================================================

/// Forwards audio commands over an unbounded channel.
///
/// The consumer on the other end is the audio renderer collaborator;
/// integration tests drain the receiver to assert on command sequences.
#[derive(Debug)]
pub struct ChannelAudioGraph {
    tx: mpsc::UnboundedSender<AudioCommand>,
}

impl ChannelAudioGraph {
    /// Create the adapter plus the consumer half.
    #[must_use]
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<AudioCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn submit(&self, command: AudioCommand) -> Result<(), AudioGraphError> {
        self.tx
            .send(command)
            .map_err(|_| AudioGraphError::Disconnected)
    }
}

impl AudioGraph for ChannelAudioGraph {
    fn initialize(&mut self) -> Result<(), AudioGraphError> {
        self.submit(AudioCommand::InitializeGraph)
    }

    fn ramp_param(
        &mut self,
        param: GraphParam,
        value: f64,
        window: Duration,
    ) -> Result<(), AudioGraphError> {
        self.submit(AudioCommand::RampParam { param, value, window })
    }

    fn ramp_position(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        window: Duration,
    ) -> Result<(), AudioGraphError> {
        self.submit(AudioCommand::RampPosition { x, y, z, window })
    }

    fn trigger_note(
        &mut self,
        frequency_hz: f64,
        duration: Duration,
    ) -> Result<(), AudioGraphError> {
        self.submit(AudioCommand::TriggerNote {
            frequency_hz,
            duration,
        })
    }

    fn release_note(&mut self) -> Result<(), AudioGraphError> {
        self.submit(AudioCommand::ReleaseNote)
    }

    fn dispose(&mut self) -> Result<(), AudioGraphError> {
        self.submit(AudioCommand::DisposeGraph)
    }
}

// =============================================================================
// Tracing Adapter
// =============================================================================

/// Logs every command as a structured tracing event.
///
/// Stands in for a renderer in headless runs; useful for watching the
/// sequencer work without an output device.
#[derive(Debug, Default)]
pub struct TracingAudioGraph {
    initialized: bool,
}

impl TracingAudioGraph {
    /// New, uninitialized sink.
    #[must_use]
    pub const fn new() -> Self {
        Self { initialized: false }
    }
}

impl AudioGraph for TracingAudioGraph {
    fn initialize(&mut self) -> Result<(), AudioGraphError> {
        self.initialized = true;
        tracing::info!(target: "audio_graph", "graph built; listener at origin facing forward");
        Ok(())
    }

    fn ramp_param(
        &mut self,
        param: GraphParam,
        value: f64,
        window: Duration,
    ) -> Result<(), AudioGraphError> {
        if !self.initialized {
            return Err(AudioGraphError::NotInitialized);
        }
        tracing::debug!(
            target: "audio_graph",
            param = param.as_str(),
            value,
            window = ?window,
            "ramp"
        );
        Ok(())
    }

    fn ramp_position(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        window: Duration,
    ) -> Result<(), AudioGraphError> {
        if !self.initialized {
            return Err(AudioGraphError::NotInitialized);
        }
        tracing::debug!(
            target: "audio_graph",
            x,
            y,
            z,
            window = ?window,
            "position ramp"
        );
        Ok(())
    }

    fn trigger_note(
        &mut self,
        frequency_hz: f64,
        duration: Duration,
    ) -> Result<(), AudioGraphError> {
        if !self.initialized {
            return Err(AudioGraphError::NotInitialized);
        }
        tracing::info!(
            target: "audio_graph",
            frequency_hz,
            duration = ?duration,
            "note"
        );
        Ok(())
    }

    fn release_note(&mut self) -> Result<(), AudioGraphError> {
        tracing::debug!(target: "audio_graph", "release");
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), AudioGraphError> {
        self.initialized = false;
        tracing::info!(target: "audio_graph", "graph disposed");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_adapter_forwards_commands_in_order() {
        let (mut graph, mut rx) = ChannelAudioGraph::unbounded();

        graph.initialize().unwrap();
        graph
            .ramp_param(GraphParam::ToneGain, 0.5, Duration::from_millis(60))
            .unwrap();
        graph.trigger_note(440.0, Duration::from_millis(150)).unwrap();

        assert_eq!(rx.try_recv().unwrap(), AudioCommand::InitializeGraph);
        assert!(matches!(
            rx.try_recv().unwrap(),
            AudioCommand::RampParam {
                param: GraphParam::ToneGain,
                ..
            }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            AudioCommand::TriggerNote { .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_adapter_reports_disconnected_consumer() {
        let (mut graph, rx) = ChannelAudioGraph::unbounded();
        drop(rx);

        assert!(matches!(
            graph.initialize(),
            Err(AudioGraphError::Disconnected)
        ));
    }

    #[test]
    fn tracing_adapter_requires_initialization() {
        let mut graph = TracingAudioGraph::new();
        assert!(matches!(
            graph.trigger_note(440.0, Duration::from_millis(100)),
            Err(AudioGraphError::NotInitialized)
        ));

        graph.initialize().unwrap();
        assert!(graph.trigger_note(440.0, Duration::from_millis(100)).is_ok());
    }
}
