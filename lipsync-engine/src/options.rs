//! Sequence generation options

use crate::servo::Servo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a "no change" sample is perturbed when `no_change_randomize` is on
///
/// `range` below is the width of the sample's amplitude bucket in percent
/// (25 for `25-50`, 50 for a widened `0-25`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RandomBoostRange {
    /// Uniform in `[0, range]`
    #[default]
    #[serde(rename = "0 to +range")]
    ZeroToPositive,
    /// Uniform in `[-range, 0]`
    #[serde(rename = "0 to -range")]
    ZeroToNegative,
    /// Uniform in `[0, range]`, negated when the amplitude is falling
    #[serde(rename = "0 to range by directions from last")]
    ByDirection,
    /// `uniform(0, range) / 2 - range`
    #[serde(rename = "-range/2 to +range/2")]
    HalfRange,
    /// `round(uniform(0, 2 * range)) - range`
    #[serde(rename = "-range to +range")]
    FullRange,
}

impl RandomBoostRange {
    pub const ALL: [RandomBoostRange; 5] = [
        RandomBoostRange::ZeroToPositive,
        RandomBoostRange::ZeroToNegative,
        RandomBoostRange::ByDirection,
        RandomBoostRange::HalfRange,
        RandomBoostRange::FullRange,
    ];

    /// Label used in settings and saved sequences
    pub fn label(&self) -> &'static str {
        match self {
            RandomBoostRange::ZeroToPositive => "0 to +range",
            RandomBoostRange::ZeroToNegative => "0 to -range",
            RandomBoostRange::ByDirection => "0 to range by directions from last",
            RandomBoostRange::HalfRange => "-range/2 to +range/2",
            RandomBoostRange::FullRange => "-range to +range",
        }
    }
}

impl fmt::Display for RandomBoostRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unrecognized random boost range label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown random boost range: {0:?}")]
pub struct UnknownRangeBoost(pub String);

impl FromStr for RandomBoostRange {
    type Err = UnknownRangeBoost;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.label() == s.trim())
            .ok_or_else(|| UnknownRangeBoost(s.to_string()))
    }
}

/// Options controlling how an envelope becomes a servo sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequenceOptions {
    /// Lower amplitude maps to a higher pulse width
    pub inverted: bool,
    /// Work from the normalized envelope rather than the raw one
    pub use_normalized_amplitude: bool,
    /// Pulse width added to quiet samples inside the floor boost band
    pub servo_floor_boost: i32,
    /// Floor boost band lower bound (exclusive)
    pub floor_boost_min_amplitude: f32,
    /// Floor boost band upper bound (inclusive)
    pub floor_boost_max_amplitude: f32,
    /// Highest pulse width emitted
    pub servo_ceiling: i32,
    /// Lowest pulse width emitted
    pub servo_floor: i32,
    /// Amplitude-to-width scale, `servo_ceiling - servo_floor` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servo_range: Option<i32>,
    // Accepted and persisted, not yet applied by the generator
    pub servo_random_boost: bool,
    pub servo_random_boost_min: i32,
    pub servo_random_boost_max: i32,
    pub servo_random_boost_min_amplitude: f32,
    pub servo_random_boost_max_amplitude: f32,
    /// Perturb samples whose bucket did not change since the previous one
    pub no_change_randomize: bool,
    pub no_change_randomize_range_boost: RandomBoostRange,
    /// Treat the `0-25` bucket as `0-50` when sizing the perturbation
    pub boost_no_change_level_25: bool,
    /// Log clamp and numeric recoveries
    pub verbose_error: bool,
    /// Log every generated sample
    pub verbose_debugging: bool,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            inverted: false,
            use_normalized_amplitude: true,
            servo_floor_boost: 0,
            floor_boost_min_amplitude: 0.0,
            floor_boost_max_amplitude: 0.25,
            servo_ceiling: 2500,
            servo_floor: 500,
            servo_range: None,
            servo_random_boost: false,
            servo_random_boost_min: 0,
            servo_random_boost_max: 0,
            servo_random_boost_min_amplitude: 0.0,
            servo_random_boost_max_amplitude: 1.0,
            no_change_randomize: false,
            no_change_randomize_range_boost: RandomBoostRange::default(),
            boost_no_change_level_25: false,
            verbose_error: false,
            verbose_debugging: false,
        }
    }
}

impl SequenceOptions {
    /// Width scale applied to amplitudes
    pub fn range(&self) -> i32 {
        self.servo_range
            .unwrap_or(self.servo_ceiling.saturating_sub(self.servo_floor))
    }

    /// Take floor and ceiling from a servo's pulse limits
    pub fn with_servo_bounds(mut self, servo: &Servo) -> Self {
        self.servo_floor = servo.min_pulse;
        self.servo_ceiling = servo.max_pulse;
        self
    }
}
