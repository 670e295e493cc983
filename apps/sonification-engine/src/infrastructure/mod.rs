//! Infrastructure Layer
//!
//! Adapters and external integrations.

/// Audio-output adapters for the audio-graph port.
pub mod audio;

/// Broadcast fan-out to chart subscribers.
pub mod broadcast;

/// Configuration loaded from the environment.
pub mod config;

/// Tick feed adapters.
pub mod feed;

/// Prometheus metrics.
pub mod metrics;

/// Tracing subscriber setup.
pub mod telemetry;
