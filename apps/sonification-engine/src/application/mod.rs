//! Application Layer
//!
//! Use cases and port definitions.

/// Interfaces for the audio, chart, and feed collaborators.
pub mod ports;

/// Orchestration services over the domain and ports.
pub mod services;
