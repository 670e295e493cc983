//! Control Service
//!
//! Bridges UI-side control commands onto the playback engine. Commands
//! arrive over an mpsc channel from whatever drives the controls (buttons,
//! a terminal, a remote surface); the service owns the engine handle and
//! the always-current point sequence maintained by the ingest service.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::AudioGraph;
use crate::application::services::ingest::SharedPoints;
use crate::application::services::playback::SpatialAudioEngine;
use crate::domain::externalization::PresetName;

/// A command from the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Start playback over the latest mapped point sequence.
    Play,
    /// Abort the active playback session.
    Stop,
    /// Switch the externalization preset (mid-playback allowed).
    SetPreset(PresetName),
}

/// Command loop between the UI collaborator and the engine.
pub struct ControlService<G: AudioGraph + 'static> {
    engine: SpatialAudioEngine<G>,
    points: SharedPoints,
    rx: mpsc::Receiver<ControlCommand>,
}

impl<G: AudioGraph + 'static> ControlService<G> {
    /// Create the service; `points` is shared with the ingest service.
    #[must_use]
    pub fn new(
        engine: SpatialAudioEngine<G>,
        points: SharedPoints,
        rx: mpsc::Receiver<ControlCommand>,
    ) -> Self {
        Self { engine, points, rx }
    }

    /// Process commands until the channel closes or shutdown fires.
    ///
    /// Engine errors (an unavailable output device, a vanished audio
    /// collaborator) are logged and leave the loop running — the caller
    /// may simply retry the command.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("control service started");

        loop {
            let command = tokio::select! {
                () = shutdown.cancelled() => break,
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break,
                },
            };

            self.handle(command);
        }

        self.engine.stop();
        tracing::info!("control service stopped");
    }

    fn handle(&self, command: ControlCommand) {
        match command {
            ControlCommand::Play => {
                let points = self.points.lock().clone();
                if let Err(e) = self.engine.play(points) {
                    tracing::error!(error = %e, "failed to start playback");
                }
            }
            ControlCommand::Stop => self.engine.stop(),
            ControlCommand::SetPreset(name) => {
                if let Err(e) = self.engine.apply_preset(name) {
                    tracing::error!(error = %e, preset = %name, "failed to apply preset");
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::application::ports::{MockAudioGraph, MockIndexObserver};
    use crate::application::services::playback::PlaybackSettings;
    use crate::domain::spatial::SpherePoint;

    use super::*;

    fn engine_with(graph: MockAudioGraph) -> SpatialAudioEngine<MockAudioGraph> {
        let mut observer = MockIndexObserver::new();
        observer.expect_on_index_changed().return_const(());
        SpatialAudioEngine::new(graph, Arc::new(observer), PlaybackSettings::default())
    }

    #[tokio::test]
    async fn play_with_no_points_is_a_quiet_no_op() {
        // Empty point sequence: the graph must never be touched.
        let engine = engine_with(MockAudioGraph::new());
        let points: SharedPoints = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel(8);
        let service = ControlService::new(engine, points, rx);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(service.run(shutdown.clone()));

        tx.send(ControlCommand::Play).await.unwrap();
        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn set_preset_reaches_the_graph() {
        let mut graph = MockAudioGraph::new();
        graph.expect_initialize().times(1).returning(|| Ok(()));
        graph
            .expect_ramp_param()
            .times(5)
            .returning(|_, _, _| Ok(()));
        graph.expect_release_note().returning(|| Ok(()));

        let engine = engine_with(graph);
        let points: SharedPoints = Arc::new(Mutex::new(vec![SpherePoint {
            x: 0.0,
            y: 0.0,
            z: -1.0,
            freq: 440.0,
            source_index: 0,
        }]));
        let (tx, rx) = mpsc::channel(8);
        let service = ControlService::new(engine, points, rx);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(service.run(shutdown.clone()));

        tx.send(ControlCommand::SetPreset(PresetName::Strong))
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
