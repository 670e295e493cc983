//! Configuration
//!
//! Environment-driven configuration for the engine binary.

mod settings;

pub use settings::{ConfigError, EngineConfig, FeedSelection, FeedSettings, SeriesSettings};
