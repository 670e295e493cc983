//! Externalization Presets
//!
//! Fixed parameter sets that make the spatialized tone feel outside the
//! head rather than inside it: simulated source distance, early-reflection
//! and late-reverb send levels, spectral tilt, and the stereo asymmetry
//! applied to early reflections during playback.
//!
//! Preset strength increases monotonically from `low` to `strong`.

use serde::{Deserialize, Serialize};

// =============================================================================
// Preset Names
// =============================================================================

/// Named externalization strength, `basic` by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Subtle externalization: close source, dry mix.
    Low,
    /// Default externalization.
    #[default]
    Basic,
    /// Pronounced externalization: distant source, wet mix.
    Strong,
}

impl PresetName {
    /// Parse a preset name; unrecognized names resolve to `basic`.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "low" => Self::Low,
            "strong" => Self::Strong,
            _ => Self::Basic,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Basic => "basic",
            Self::Strong => "strong",
        }
    }
}

impl std::fmt::Display for PresetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Presets
// =============================================================================

/// Immutable externalization parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    /// Simulated source distance in meters, scaled by point magnitude
    /// during playback.
    pub distance: f64,
    /// Early-reflection send gain (linear).
    pub early_reflection_gain: f64,
    /// Late-reverb send gain (linear).
    pub late_reverb_gain: f64,
    /// High-shelf EQ gain in dB; more negative means duller, more distant.
    pub high_shelf_db: f64,
    /// Left/right early-reflection cross-fade strength in [0, 1].
    pub asymmetry_scale: f64,
}

const LOW: Preset = Preset {
    distance: 1.0,
    early_reflection_gain: 0.12,
    late_reverb_gain: 0.05,
    high_shelf_db: -1.5,
    asymmetry_scale: 0.15,
};

const BASIC: Preset = Preset {
    distance: 2.0,
    early_reflection_gain: 0.25,
    late_reverb_gain: 0.12,
    high_shelf_db: -3.0,
    asymmetry_scale: 0.3,
};

const STRONG: Preset = Preset {
    distance: 4.0,
    early_reflection_gain: 0.45,
    late_reverb_gain: 0.28,
    high_shelf_db: -6.0,
    asymmetry_scale: 0.5,
};

/// Look up the parameter set for a preset name.
#[must_use]
pub const fn preset_for(name: PresetName) -> Preset {
    match name {
        PresetName::Low => LOW,
        PresetName::Basic => BASIC,
        PresetName::Strong => STRONG,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("low", PresetName::Low; "lowercase low")]
    #[test_case("LOW", PresetName::Low; "uppercase low")]
    #[test_case("basic", PresetName::Basic; "basic")]
    #[test_case("Strong", PresetName::Strong; "mixed case strong")]
    #[test_case("cathedral", PresetName::Basic; "unknown falls back to basic")]
    #[test_case("", PresetName::Basic; "empty falls back to basic")]
    fn preset_name_parsing(input: &str, expected: PresetName) {
        assert_eq!(PresetName::from_str_case_insensitive(input), expected);
    }

    #[test]
    fn strength_increases_monotonically() {
        let low = preset_for(PresetName::Low);
        let basic = preset_for(PresetName::Basic);
        let strong = preset_for(PresetName::Strong);

        assert!(low.distance < basic.distance && basic.distance < strong.distance);
        assert!(
            low.early_reflection_gain < basic.early_reflection_gain
                && basic.early_reflection_gain < strong.early_reflection_gain
        );
        assert!(
            low.late_reverb_gain < basic.late_reverb_gain
                && basic.late_reverb_gain < strong.late_reverb_gain
        );
        // High-frequency attenuation deepens with strength.
        assert!(low.high_shelf_db > basic.high_shelf_db);
        assert!(basic.high_shelf_db > strong.high_shelf_db);
        assert!(
            low.asymmetry_scale < basic.asymmetry_scale
                && basic.asymmetry_scale < strong.asymmetry_scale
        );
    }

    #[test]
    fn asymmetry_stays_in_unit_range() {
        for name in [PresetName::Low, PresetName::Basic, PresetName::Strong] {
            let preset = preset_for(name);
            assert!(preset.asymmetry_scale >= 0.0 && preset.asymmetry_scale <= 1.0);
        }
    }

    #[test]
    fn display_matches_canonical_name() {
        assert_eq!(PresetName::Low.to_string(), "low");
        assert_eq!(PresetName::Basic.to_string(), "basic");
        assert_eq!(PresetName::Strong.to_string(), "strong");
    }
}
