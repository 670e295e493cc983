//! Engine Configuration Settings
//!
//! Configuration types for the sonification engine, loaded from
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::playback::PlaybackSettings;
use crate::domain::externalization::PresetName;
use crate::infrastructure::broadcast::HubConfig;

/// Which tick source the binary wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedSelection {
    /// Random-walk generator (no external data needed).
    #[default]
    Synthetic,
    /// Historical record replay from a JSON file.
    Replay,
}

impl FeedSelection {
    /// Parse a feed selection from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "replay" => Self::Replay,
            _ => Self::Synthetic,
        }
    }

    /// Get the selection name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Synthetic => "synthetic",
            Self::Replay => "replay",
        }
    }
}

/// Series buffer settings.
#[derive(Debug, Clone, Copy)]
pub struct SeriesSettings {
    /// Maximum buckets retained in a snapshot.
    pub capacity: usize,
    /// Flush cadence.
    pub flush_cadence: Duration,
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            flush_cadence: Duration::from_secs(1),
        }
    }
}

/// Feed adapter settings.
#[derive(Debug, Clone, Default)]
pub struct FeedSettings {
    /// Selected tick source.
    pub selection: FeedSelection,
    /// Record file for replay feeds.
    pub data_file: Option<PathBuf>,
    /// Delay between replayed records (zero = push the whole batch).
    pub replay_pace: Duration,
}

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Series buffer settings.
    pub series: SeriesSettings,
    /// Playback sequencer settings.
    pub playback: PlaybackSettings,
    /// Broadcast channel capacities.
    pub broadcast: HubConfig,
    /// Feed adapter settings.
    pub feed: FeedSettings,
    /// Externalization preset applied at startup.
    pub default_preset: PresetName,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            series: SeriesSettings::default(),
            playback: PlaybackSettings::default(),
            broadcast: HubConfig::default(),
            feed: FeedSettings::default(),
            default_preset: PresetName::Basic,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a replay feed is selected without a record
    /// file, or a provided value is empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let series = SeriesSettings {
            capacity: parse_env_usize(
                "SONIFIER_SERIES_CAPACITY",
                SeriesSettings::default().capacity,
            ),
            flush_cadence: parse_env_duration_millis(
                "SONIFIER_FLUSH_CADENCE_MS",
                SeriesSettings::default().flush_cadence,
            ),
        };

        let playback = PlaybackSettings {
            step_interval: parse_env_duration_millis(
                "SONIFIER_STEP_INTERVAL_MS",
                PlaybackSettings::default().step_interval,
            ),
            position_ramp: parse_env_duration_millis(
                "SONIFIER_POSITION_RAMP_MS",
                PlaybackSettings::default().position_ramp,
            ),
            preset_ramp: parse_env_duration_millis(
                "SONIFIER_PRESET_RAMP_MS",
                PlaybackSettings::default().preset_ramp,
            ),
            note_duration: parse_env_duration_millis(
                "SONIFIER_NOTE_DURATION_MS",
                PlaybackSettings::default().note_duration,
            ),
            gain_change_speed: parse_env_f64(
                "SONIFIER_GAIN_CHANGE_SPEED",
                PlaybackSettings::default().gain_change_speed,
            ),
        };

        let broadcast = HubConfig {
            snapshots_capacity: parse_env_usize(
                "SONIFIER_SNAPSHOTS_CAPACITY",
                HubConfig::default().snapshots_capacity,
            ),
            indices_capacity: parse_env_usize(
                "SONIFIER_INDICES_CAPACITY",
                HubConfig::default().indices_capacity,
            ),
        };

        let selection = std::env::var("SONIFIER_FEED")
            .map(|s| FeedSelection::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let data_file = match std::env::var("SONIFIER_DATA_FILE") {
            Ok(path) if path.is_empty() => {
                return Err(ConfigError::EmptyValue("SONIFIER_DATA_FILE".to_string()));
            }
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => None,
        };

        if selection == FeedSelection::Replay && data_file.is_none() {
            return Err(ConfigError::MissingEnvVar("SONIFIER_DATA_FILE".to_string()));
        }

        let feed = FeedSettings {
            selection,
            data_file,
            replay_pace: parse_env_duration_millis(
                "SONIFIER_REPLAY_PACE_MS",
                Duration::from_millis(50),
            ),
        };

        let default_preset = std::env::var("SONIFIER_PRESET")
            .map(|s| PresetName::from_str_case_insensitive(&s))
            .unwrap_or_default();

        Ok(Self {
            series,
            playback,
            broadcast,
            feed,
            default_preset,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("synthetic", FeedSelection::Synthetic; "synthetic")]
    #[test_case("SYNTHETIC", FeedSelection::Synthetic; "uppercase synthetic")]
    #[test_case("replay", FeedSelection::Replay; "replay")]
    #[test_case("Replay", FeedSelection::Replay; "mixed case replay")]
    #[test_case("unknown", FeedSelection::Synthetic; "unknown falls back")]
    fn feed_selection_parsing(input: &str, expected: FeedSelection) {
        assert_eq!(FeedSelection::from_str_case_insensitive(input), expected);
    }

    #[test]
    fn series_settings_defaults() {
        let settings = SeriesSettings::default();
        assert_eq!(settings.capacity, 100);
        assert_eq!(settings.flush_cadence, Duration::from_secs(1));
    }

    #[test]
    fn playback_settings_defaults() {
        let settings = PlaybackSettings::default();
        assert_eq!(settings.step_interval, Duration::from_millis(200));
        assert_eq!(settings.position_ramp, Duration::from_millis(60));
        assert_eq!(settings.preset_ramp, Duration::from_millis(150));
        assert!((settings.gain_change_speed - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.feed.selection, FeedSelection::Synthetic);
        assert_eq!(config.default_preset, PresetName::Basic);
        assert_eq!(config.broadcast.snapshots_capacity, 64);
    }
}
