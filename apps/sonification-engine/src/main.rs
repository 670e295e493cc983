//! Sonification Engine Binary
//!
//! Starts the market data sonification service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sonification-engine
//! ```
//!
//! Control commands are read from stdin: `play`, `stop`,
//! `preset <low|basic|strong>`, `quit`.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SONIFIER_FEED`: Tick source - "synthetic" | "replay" (default: synthetic)
//! - `SONIFIER_DATA_FILE`: Record file for replay feeds (required for replay)
//! - `SONIFIER_REPLAY_PACE_MS`: Delay between replayed records (default: 50)
//! - `SONIFIER_SERIES_CAPACITY`: Max buckets per snapshot (default: 100)
//! - `SONIFIER_FLUSH_CADENCE_MS`: Flush cadence (default: 1000)
//! - `SONIFIER_STEP_INTERVAL_MS`: Playback step interval (default: 200)
//! - `SONIFIER_PRESET`: Startup preset - "low" | "basic" | "strong" (default: basic)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use parking_lot::Mutex;
use sonification_engine::application::services::control::{ControlCommand, ControlService};
use sonification_engine::application::services::ingest::{IngestService, SharedPoints};
use sonification_engine::application::services::playback::{PlaybackCursor, SpatialAudioEngine};
use sonification_engine::domain::externalization::PresetName;
use sonification_engine::domain::series::SeriesBuffer;
use sonification_engine::infrastructure::config::{EngineConfig, FeedSelection};
use sonification_engine::infrastructure::audio::TracingAudioGraph;
use sonification_engine::infrastructure::broadcast::{HubIndexObserver, SnapshotHub};
use sonification_engine::infrastructure::feed::{ReplayFeed, SyntheticFeed, SyntheticFeedConfig};
use sonification_engine::infrastructure::telemetry;
use sonification_engine::init_metrics;
use sonification_engine::TickSource;
use tokio::io::AsyncBufReadExt;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize tracing
    telemetry::init();

    tracing::info!("Starting Sonification Engine");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = EngineConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Series buffer and its push handle
    let (buffer, tick_sender) = SeriesBuffer::with_capacity(config.series.capacity);

    // Broadcast hub for chart subscribers
    let hub = Arc::new(SnapshotHub::new(config.broadcast));

    // Shared playback position and point sequence
    let cursor = Arc::new(PlaybackCursor::new());
    let points: SharedPoints = Arc::new(Mutex::new(Vec::new()));

    // Playback engine over the logging audio sink
    let observer = Arc::new(HubIndexObserver::new(Arc::clone(&hub), Arc::clone(&cursor)));
    let engine = SpatialAudioEngine::new(TracingAudioGraph::new(), observer, config.playback);

    if let Err(e) = engine.apply_preset(config.default_preset) {
        tracing::warn!(error = %e, "startup preset not applied; audio output unavailable");
    }

    // Spawn ingest flush loop
    let ingest = IngestService::new(
        buffer,
        Arc::clone(&hub),
        Arc::clone(&cursor),
        Arc::clone(&points),
        config.series.flush_cadence,
    );
    tokio::spawn(ingest.run(shutdown_token.clone()));

    // Spawn control service fed from stdin
    let (control_tx, control_rx) = mpsc::channel::<ControlCommand>(32);
    let control = ControlService::new(engine, Arc::clone(&points), control_rx);
    tokio::spawn(control.run(shutdown_token.clone()));
    tokio::spawn(read_stdin_commands(control_tx, shutdown_token.clone()));

    // Spawn the selected tick feed
    // Config validation guarantees a data file whenever replay is selected.
    let feed: Box<dyn TickSource> = match (config.feed.selection, config.feed.data_file.clone()) {
        (FeedSelection::Replay, Some(path)) => {
            Box::new(ReplayFeed::new(path, config.feed.replay_pace))
        }
        _ => Box::new(SyntheticFeed::new(SyntheticFeedConfig::default())),
    };
    let feed_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = feed.run(tick_sender, feed_shutdown).await {
            tracing::error!(error = %e, "tick feed error");
        }
    });

    tracing::info!("Sonification engine ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Sonification engine stopped");
    Ok(())
}

/// Translate stdin lines into control commands.
async fn read_stdin_commands(tx: mpsc::Sender<ControlCommand>, shutdown: CancellationToken) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                _ => break,
            },
        };

        let trimmed = line.trim();
        let command = match trimmed.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["play"] => Some(ControlCommand::Play),
            ["stop"] => Some(ControlCommand::Stop),
            ["preset", name] => Some(ControlCommand::SetPreset(
                PresetName::from_str_case_insensitive(name),
            )),
            ["quit" | "exit"] => {
                shutdown.cancel();
                break;
            }
            [] => None,
            _ => {
                tracing::warn!(input = trimmed, "unknown command (try: play, stop, preset <name>, quit)");
                None
            }
        };

        if let Some(command) = command
            && tx.send(command).await.is_err()
        {
            break;
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &EngineConfig) {
    tracing::info!(
        feed = config.feed.selection.as_str(),
        series_capacity = config.series.capacity,
        flush_cadence = ?config.series.flush_cadence,
        step_interval = ?config.playback.step_interval,
        preset = %config.default_preset,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => {
            tracing::info!("Shutdown requested from console");
        }
    }

    shutdown_token.cancel();
}
