//! Servo configuration and channel allocation

use crate::random::RandomSource;
use crate::wire::{CommandWriter, ServoCommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Channel value meaning "not connected to the controller"
pub const UNASSIGNED_CHANNEL: i32 = -1;

/// Highest channel the controller addresses
pub const MAX_CHANNEL: i32 = 30;

/// Milliseconds between test pattern steps
pub const TEST_STEP_INTERVAL_MS: u64 = 100;

/// Pulse width moved per fast sweep step
pub const FAST_SWEEP_STEP: i32 = 100;

/// Steps the points sweep holds each point before moving on
pub const SWEEP_POINTS_DWELL: u32 = 10;

/// Reasons a servo change is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServoError {
    #[error("Min pulse {min} is greater than max pulse {max}")]
    InvertedPulseBounds { min: i32, max: i32 },
    #[error("Pulse width {pulse_width} is not between min {min} and max {max}")]
    PulseOutOfRange { pulse_width: i32, min: i32, max: i32 },
    #[error("Channel {0} is outside -1..=30")]
    ChannelOutOfRange(i32),
    #[error("No free channel found from {requested} (stopped at {reached})")]
    ChannelsExhausted { requested: i32, reached: i32 },
    #[error("No servo at index {0}")]
    NoSuchServo(usize),
    #[error("Cannot remove the last servo")]
    LastServo,
    #[error("Failed to send servo command: {0}")]
    Send(String),
    #[error("Pulse range {range} is too small for a fast sweep, needs {needed}")]
    RangeTooSmall { range: i32, needed: i32 },
}

/// A servo on the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Servo {
    /// Controller channel, [`UNASSIGNED_CHANNEL`] when not connected
    pub channel: i32,
    /// Minimum pulse in microseconds
    pub min_pulse: i32,
    /// Maximum pulse in microseconds
    pub max_pulse: i32,
    /// Current pulse in microseconds
    pub pulse_width: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Servo {
    /// A fresh, unassigned servo
    pub fn new(index: usize) -> Self {
        Self {
            channel: UNASSIGNED_CHANNEL,
            min_pulse: 0,
            max_pulse: 2000,
            pulse_width: 1000,
            name: Some(format!("Servo {index}")),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.channel != UNASSIGNED_CHANNEL
    }

    /// Apply saved settings, pulling the pulse width inside the new limits
    pub fn apply_settings(&mut self, settings: &ServoSettings) {
        self.name = Some(settings.name.clone());
        self.channel = settings.channel;
        self.min_pulse = settings.min_pulse;
        self.max_pulse = settings.max_pulse;
        self.pulse_width = self.pulse_width.clamp(
            settings.min_pulse.min(settings.max_pulse),
            settings.max_pulse.max(settings.min_pulse),
        );
    }

    pub fn settings(&self) -> ServoSettings {
        ServoSettings {
            name: self.name.clone().unwrap_or_default(),
            channel: self.channel,
            min_pulse: self.min_pulse,
            max_pulse: self.max_pulse,
        }
    }

    /// Command that moves this servo to its current pulse width
    pub fn command(&self) -> ServoCommand {
        ServoCommand::new(self.channel, self.pulse_width)
    }
}

/// Named, saveable servo limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServoSettings {
    pub name: String,
    pub channel: i32,
    pub min_pulse: i32,
    pub max_pulse: i32,
}

impl ServoSettings {
    /// Limits used for a name with nothing saved
    pub fn default_named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            channel: UNASSIGNED_CHANNEL,
            min_pulse: 500,
            max_pulse: 2500,
        }
    }

    pub fn to_servo(&self) -> Servo {
        let mut servo = Servo::new(0);
        servo.apply_settings(self);
        servo
    }
}

/// Reject channels the controller cannot address
pub fn check_channel(channel: i32) -> Result<i32, ServoError> {
    if (UNASSIGNED_CHANNEL..=MAX_CHANNEL).contains(&channel) {
        Ok(channel)
    } else {
        Err(ServoError::ChannelOutOfRange(channel))
    }
}

/// Validate a servo change against the rest of the set
///
/// Rejects inverted pulse limits and a pulse width outside them. When the
/// requested channel is held by another servo, walks away from the servo's
/// old channel in the direction of the change until a free channel is found;
/// walking down to -1 leaves the servo unassigned, walking past
/// [`MAX_CHANNEL`] rejects the change.
pub fn validate(index: usize, servos: &[Servo], candidate: Servo) -> Result<Servo, ServoError> {
    if candidate.min_pulse > candidate.max_pulse {
        return Err(ServoError::InvertedPulseBounds {
            min: candidate.min_pulse,
            max: candidate.max_pulse,
        });
    }
    if candidate.pulse_width < candidate.min_pulse || candidate.pulse_width > candidate.max_pulse {
        return Err(ServoError::PulseOutOfRange {
            pulse_width: candidate.pulse_width,
            min: candidate.min_pulse,
            max: candidate.max_pulse,
        });
    }
    check_channel(candidate.channel)?;
    if !candidate.is_assigned() {
        return Ok(candidate);
    }

    let claimed = |channel: i32| {
        servos
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && s.channel == channel)
    };

    if !claimed(candidate.channel) {
        return Ok(candidate);
    }

    let requested = candidate.channel;
    let old = servos
        .get(index)
        .map(|s| s.channel)
        .unwrap_or(UNASSIGNED_CHANNEL);
    let step = if requested > old { 1 } else { -1 };

    let mut channel = requested;
    while claimed(channel) {
        channel += step;
        if channel == UNASSIGNED_CHANNEL {
            break;
        }
        if channel > MAX_CHANNEL {
            tracing::info!(index, requested, "no free channel above requested, change refused");
            return Err(ServoError::ChannelsExhausted {
                requested,
                reached: channel,
            });
        }
    }

    tracing::info!(index, old, requested, resolved = channel, "channel in use, found alternate");
    Ok(Servo { channel, ..candidate })
}

/// The servos configured on one controller
#[derive(Debug, Clone)]
pub struct ServoSet {
    servos: Vec<Servo>,
}

impl Default for ServoSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ServoSet {
    /// A set holding one fresh servo
    pub fn new() -> Self {
        Self {
            servos: vec![Servo::new(0)],
        }
    }

    pub fn servos(&self) -> &[Servo] {
        &self.servos
    }

    pub fn get(&self, index: usize) -> Option<&Servo> {
        self.servos.get(index)
    }

    pub fn len(&self) -> usize {
        self.servos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servos.is_empty()
    }

    /// Append a fresh servo and return its index
    pub fn add(&mut self) -> usize {
        let index = self.servos.len();
        self.servos.push(Servo::new(index));
        index
    }

    /// Append a servo built from saved settings, resolving its channel
    pub fn add_from_settings(&mut self, settings: &ServoSettings) -> Result<usize, ServoError> {
        let index = self.servos.len();
        let candidate = validate(index, &self.servos, settings.to_servo())?;
        self.servos.push(candidate);
        Ok(index)
    }

    pub fn remove(&mut self, index: usize) -> Result<Servo, ServoError> {
        if index >= self.servos.len() {
            return Err(ServoError::NoSuchServo(index));
        }
        if self.servos.len() < 2 {
            return Err(ServoError::LastServo);
        }
        Ok(self.servos.remove(index))
    }

    /// Validate and apply a change; the set is untouched on rejection
    pub fn change(&mut self, index: usize, candidate: Servo) -> Result<&Servo, ServoError> {
        if index >= self.servos.len() {
            return Err(ServoError::NoSuchServo(index));
        }
        let accepted = validate(index, &self.servos, candidate)?;
        self.servos[index] = accepted;
        Ok(&self.servos[index])
    }

    /// Apply a change and move the physical servo if its pulse width changed
    pub fn change_live<W: Write>(
        &mut self,
        index: usize,
        candidate: Servo,
        writer: &CommandWriter<W>,
    ) -> Result<&Servo, ServoError> {
        let previous = self
            .servos
            .get(index)
            .map(|s| s.pulse_width)
            .ok_or(ServoError::NoSuchServo(index))?;
        let accepted = validate(index, &self.servos, candidate)?;

        if accepted.is_assigned() && accepted.pulse_width != previous {
            writer
                .send(&accepted.command())
                .map_err(|e| ServoError::Send(e.to_string()))?;
        }

        self.servos[index] = accepted;
        Ok(&self.servos[index])
    }

    /// Move a servo one step of its test pattern
    ///
    /// The step goes through [`ServoSet::change_live`], so a rejected pulse
    /// leaves the servo where it was.
    pub fn step_test<W: Write, R: RandomSource + ?Sized>(
        &mut self,
        index: usize,
        tester: &mut ServoTester,
        rng: &mut R,
        writer: &CommandWriter<W>,
    ) -> Result<&Servo, ServoError> {
        let current = self.servos.get(index).ok_or(ServoError::NoSuchServo(index))?;
        let candidate = Servo {
            pulse_width: tester.next_pulse(current, rng),
            ..current.clone()
        };
        self.change_live(index, candidate, writer)
    }
}

/// Motion used to exercise a servo across its limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestPattern {
    /// One microsecond per step, reversing at the limits
    Sweep,
    /// [`FAST_SWEEP_STEP`] per step, clamped to and reversing at the limits
    FastSweep,
    /// Min, mid and max in turn, holding each for [`SWEEP_POINTS_DWELL`] steps
    SweepPoints,
    Random,
    Min,
    Mid,
    Max,
}

impl TestPattern {
    pub const ALL: [TestPattern; 7] = [
        TestPattern::Sweep,
        TestPattern::FastSweep,
        TestPattern::SweepPoints,
        TestPattern::Random,
        TestPattern::Min,
        TestPattern::Mid,
        TestPattern::Max,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TestPattern::Sweep => "sweep",
            TestPattern::FastSweep => "fast-sweep",
            TestPattern::SweepPoints => "sweep-points",
            TestPattern::Random => "random",
            TestPattern::Min => "min",
            TestPattern::Mid => "mid",
            TestPattern::Max => "max",
        }
    }
}

impl fmt::Display for TestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unrecognized test pattern name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown test pattern: {0:?}")]
pub struct UnknownTestPattern(pub String);

impl FromStr for TestPattern {
    type Err = UnknownTestPattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.label() == s.trim())
            .ok_or_else(|| UnknownTestPattern(s.to_string()))
    }
}

/// Midpoint of a servo's limits, rounded down
fn mid_pulse(servo: &Servo) -> i32 {
    let (min, max) = (servo.min_pulse as i64, servo.max_pulse as i64);
    (min + (max - min).div_euclid(2)) as i32
}

/// Running state of one servo's test pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoTester {
    pattern: TestPattern,
    rising: bool,
    /// Steps spent at the current point of a points sweep
    dwell: u32,
}

impl ServoTester {
    /// Begin `pattern` from the servo's current pulse width
    ///
    /// A fast sweep is refused when the limits are closer than one step.
    pub fn start(pattern: TestPattern, servo: &Servo) -> Result<Self, ServoError> {
        let rising = match pattern {
            TestPattern::Sweep => servo.pulse_width < servo.max_pulse,
            TestPattern::FastSweep => {
                let range = servo.max_pulse.saturating_sub(servo.min_pulse);
                if range < FAST_SWEEP_STEP {
                    tracing::info!(range, "fast sweep not possible, range too small");
                    return Err(ServoError::RangeTooSmall {
                        range,
                        needed: FAST_SWEEP_STEP,
                    });
                }
                servo.pulse_width.saturating_add(FAST_SWEEP_STEP) < servo.max_pulse
            }
            _ => true,
        };
        Ok(Self {
            pattern,
            rising,
            dwell: 0,
        })
    }

    pub fn pattern(&self) -> TestPattern {
        self.pattern
    }

    /// Pulse width for the next step, advancing the pattern
    pub fn next_pulse<R: RandomSource + ?Sized>(&mut self, servo: &Servo, rng: &mut R) -> i32 {
        let (min, max, current) = (servo.min_pulse, servo.max_pulse, servo.pulse_width);
        match self.pattern {
            TestPattern::Sweep => {
                if self.rising && current >= max {
                    self.rising = false;
                } else if !self.rising && current <= min {
                    self.rising = true;
                }
                if self.rising {
                    current.saturating_add(1)
                } else {
                    current.saturating_sub(1)
                }
            }
            TestPattern::FastSweep => {
                if self.rising {
                    let next = current.saturating_add(FAST_SWEEP_STEP);
                    if next >= max {
                        self.rising = false;
                        return max;
                    }
                    next
                } else {
                    let next = current.saturating_sub(FAST_SWEEP_STEP);
                    if next <= min {
                        self.rising = true;
                        return min;
                    }
                    next
                }
            }
            TestPattern::SweepPoints => {
                if self.dwell < SWEEP_POINTS_DWELL {
                    self.dwell += 1;
                    return current;
                }
                self.dwell = 0;
                let mid = mid_pulse(servo);
                if self.rising {
                    if current == min {
                        mid
                    } else if current == mid {
                        max
                    } else {
                        self.rising = false;
                        mid
                    }
                } else {
                    self.rising = true;
                    if current == max {
                        mid
                    } else if current == mid {
                        min
                    } else {
                        mid
                    }
                }
            }
            TestPattern::Random => rng.uniform(min as f64, max as f64).floor() as i32,
            TestPattern::Min => min,
            TestPattern::Mid => mid_pulse(servo),
            TestPattern::Max => max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_channel(channel: i32) -> Servo {
        Servo {
            channel,
            ..Servo::new(0)
        }
    }

    #[test]
    fn test_new_servo_defaults() {
        let servo = Servo::new(3);
        assert_eq!(servo.channel, UNASSIGNED_CHANNEL);
        assert_eq!((servo.min_pulse, servo.max_pulse, servo.pulse_width), (0, 2000, 1000));
        assert_eq!(servo.name.as_deref(), Some("Servo 3"));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let candidate = Servo {
            min_pulse: 1500,
            max_pulse: 1000,
            pulse_width: 1200,
            ..Servo::new(0)
        };
        assert_eq!(
            validate(0, &[Servo::new(0)], candidate),
            Err(ServoError::InvertedPulseBounds { min: 1500, max: 1000 })
        );
    }

    #[test]
    fn test_rejects_pulse_outside_limits() {
        let candidate = Servo {
            pulse_width: 2200,
            ..Servo::new(0)
        };
        assert!(matches!(
            validate(0, &[Servo::new(0)], candidate),
            Err(ServoError::PulseOutOfRange { pulse_width: 2200, .. })
        ));
    }

    #[test]
    fn test_rejects_channel_out_of_range() {
        assert_eq!(
            validate(0, &[Servo::new(0)], on_channel(31)),
            Err(ServoError::ChannelOutOfRange(31))
        );
    }

    #[test]
    fn test_free_channel_accepted_as_is() {
        let servos = [on_channel(2), on_channel(5)];
        assert_eq!(validate(0, &servos, on_channel(3)).unwrap().channel, 3);
    }

    #[test]
    fn test_collision_walks_up() {
        let servos = [on_channel(2), on_channel(5)];
        assert_eq!(validate(0, &servos, on_channel(5)).unwrap().channel, 6);
    }

    #[test]
    fn test_collision_walks_down() {
        let servos = [on_channel(2), on_channel(5), on_channel(1)];
        // servo 1 moves 5 -> 2, 2 and 1 are taken, lands on 0
        assert_eq!(validate(1, &servos, on_channel(2)).unwrap().channel, 0);
    }

    #[test]
    fn test_collision_walks_down_to_unassigned() {
        let servos = [on_channel(0), on_channel(5)];
        assert_eq!(validate(1, &servos, on_channel(0)).unwrap().channel, UNASSIGNED_CHANNEL);
    }

    #[test]
    fn test_collision_past_max_rejected() {
        let servos = [on_channel(29), on_channel(30), on_channel(1)];
        assert_eq!(
            validate(2, &servos, on_channel(29)),
            Err(ServoError::ChannelsExhausted { requested: 29, reached: 31 })
        );
    }

    #[test]
    fn test_unassigned_never_collides() {
        let servos = [Servo::new(0), Servo::new(1)];
        assert_eq!(validate(0, &servos, Servo::new(0)).unwrap().channel, UNASSIGNED_CHANNEL);
    }

    #[test]
    fn test_set_change_keeps_previous_on_rejection() {
        let mut set = ServoSet::new();
        set.change(0, on_channel(4)).unwrap();
        let bad = Servo {
            pulse_width: 5000,
            ..on_channel(7)
        };
        assert!(set.change(0, bad).is_err());
        assert_eq!(set.get(0).unwrap().channel, 4);
    }

    #[test]
    fn test_set_add_and_remove() {
        let mut set = ServoSet::new();
        assert_eq!(set.remove(0), Err(ServoError::LastServo));
        let index = set.add();
        assert_eq!(index, 1);
        assert_eq!(set.get(1).unwrap().name.as_deref(), Some("Servo 1"));
        assert!(set.remove(0).is_ok());
        assert_eq!(set.len(), 1);
        assert_eq!(set.remove(4), Err(ServoError::NoSuchServo(4)));
    }

    #[test]
    fn test_add_from_settings_resolves_channel() {
        let mut set = ServoSet::new();
        set.change(0, on_channel(3)).unwrap();
        let settings = ServoSettings {
            channel: 3,
            ..ServoSettings::default_named("jaw")
        };
        let index = set.add_from_settings(&settings).unwrap();
        let added = set.get(index).unwrap();
        assert_eq!(added.channel, 4);
        assert_eq!((added.min_pulse, added.max_pulse), (500, 2500));
        assert_eq!(added.pulse_width, 1000);
    }

    #[test]
    fn test_change_live_sends_only_on_pulse_change() {
        let writer = CommandWriter::new(Vec::new());
        let mut set = ServoSet::new();
        set.change_live(0, on_channel(2), &writer).unwrap();
        assert!(writer.lock().is_empty());

        let moved = Servo {
            pulse_width: 1200,
            ..on_channel(2)
        };
        set.change_live(0, moved, &writer).unwrap();
        assert_eq!(writer.lock().as_slice(), b"#2P1200\r");
    }

    #[test]
    fn test_change_live_unassigned_sends_nothing() {
        let writer = CommandWriter::new(Vec::new());
        let mut set = ServoSet::new();
        let moved = Servo {
            pulse_width: 1500,
            ..Servo::new(0)
        };
        set.change_live(0, moved, &writer).unwrap();
        assert!(writer.lock().is_empty());
        assert_eq!(set.get(0).unwrap().pulse_width, 1500);
    }

    fn limited(min_pulse: i32, max_pulse: i32, pulse_width: i32) -> Servo {
        Servo {
            min_pulse,
            max_pulse,
            pulse_width,
            ..on_channel(2)
        }
    }

    /// Run `steps` test steps on a single-servo set, returning each pulse
    fn run_pattern(servo: Servo, pattern: TestPattern, steps: usize) -> Vec<i32> {
        let writer = CommandWriter::new(Vec::new());
        let mut rng = crate::random::RngSource::seeded(5);
        let mut tester = ServoTester::start(pattern, &servo).unwrap();
        let mut set = ServoSet::new();
        set.change(0, servo).unwrap();
        (0..steps)
            .map(|_| set.step_test(0, &mut tester, &mut rng, &writer).unwrap().pulse_width)
            .collect()
    }

    #[test]
    fn test_sweep_reverses_at_limits() {
        let pulses = run_pattern(limited(1000, 1003, 1001), TestPattern::Sweep, 8);
        assert_eq!(pulses, vec![1002, 1003, 1002, 1001, 1000, 1001, 1002, 1003]);
    }

    #[test]
    fn test_sweep_starts_down_at_max() {
        let pulses = run_pattern(limited(1000, 1003, 1003), TestPattern::Sweep, 2);
        assert_eq!(pulses, vec![1002, 1001]);
    }

    #[test]
    fn test_fast_sweep_clamps_and_reverses() {
        let pulses = run_pattern(limited(0, 250, 0), TestPattern::FastSweep, 7);
        assert_eq!(pulses, vec![100, 200, 250, 150, 50, 0, 100]);
    }

    #[test]
    fn test_fast_sweep_starts_down_near_max() {
        let pulses = run_pattern(limited(0, 2000, 1950), TestPattern::FastSweep, 2);
        assert_eq!(pulses, vec![1850, 1750]);
    }

    #[test]
    fn test_fast_sweep_refused_on_narrow_range() {
        assert_eq!(
            ServoTester::start(TestPattern::FastSweep, &limited(1000, 1099, 1000)),
            Err(ServoError::RangeTooSmall { range: 99, needed: 100 })
        );
        assert!(ServoTester::start(TestPattern::FastSweep, &limited(1000, 1100, 1000)).is_ok());
    }

    #[test]
    fn test_sweep_points_dwells_then_cycles() {
        let dwell = SWEEP_POINTS_DWELL as usize;
        let pulses = run_pattern(limited(0, 2000, 0), TestPattern::SweepPoints, 5 * (dwell + 1));
        assert!(pulses[..dwell].iter().all(|&p| p == 0));

        // each point is left on the step after its dwell
        let moves: Vec<i32> = pulses.iter().skip(dwell).step_by(dwell + 1).copied().collect();
        assert_eq!(moves, vec![1000, 2000, 1000, 0, 1000]);
        assert!(pulses[dwell + 1..2 * dwell + 1].iter().all(|&p| p == 1000));
    }

    #[test]
    fn test_fixed_points() {
        let servo = limited(500, 1501, 700);
        assert_eq!(run_pattern(servo.clone(), TestPattern::Min, 2), vec![500, 500]);
        assert_eq!(run_pattern(servo.clone(), TestPattern::Mid, 1), vec![1000]);
        assert_eq!(run_pattern(servo, TestPattern::Max, 1), vec![1501]);
    }

    #[test]
    fn test_random_stays_within_limits() {
        let pulses = run_pattern(limited(900, 1100, 1000), TestPattern::Random, 200);
        assert!(pulses.iter().all(|p| (900..=1100).contains(p)));
        assert!(pulses.iter().any(|&p| p != pulses[0]));
    }

    #[test]
    fn test_step_test_sends_only_moves() {
        let writer = CommandWriter::new(Vec::new());
        let mut set = ServoSet::new();
        set.change(0, on_channel(3)).unwrap();
        let mut tester = ServoTester::start(TestPattern::Max, set.get(0).unwrap()).unwrap();
        let mut rng = crate::random::RngSource::seeded(1);
        set.step_test(0, &mut tester, &mut rng, &writer).unwrap();
        set.step_test(0, &mut tester, &mut rng, &writer).unwrap();
        assert_eq!(writer.lock().as_slice(), b"#3P2000\r");
        assert!(matches!(
            set.step_test(4, &mut tester, &mut rng, &writer),
            Err(ServoError::NoSuchServo(4))
        ));
    }

    #[test]
    fn test_pattern_labels_roundtrip() {
        for pattern in TestPattern::ALL {
            assert_eq!(pattern.label().parse::<TestPattern>(), Ok(pattern));
        }
        assert!("wiggle".parse::<TestPattern>().is_err());
    }

    #[test]
    fn test_check_channel() {
        assert_eq!(check_channel(-1), Ok(-1));
        assert_eq!(check_channel(MAX_CHANNEL), Ok(MAX_CHANNEL));
        assert_eq!(check_channel(31), Err(ServoError::ChannelOutOfRange(31)));
        assert_eq!(check_channel(-2), Err(ServoError::ChannelOutOfRange(-2)));
    }

    #[test]
    fn test_settings_to_servo() {
        let settings = ServoSettings {
            name: "brow".into(),
            channel: 7,
            min_pulse: 1200,
            max_pulse: 1800,
        };
        let servo = settings.to_servo();
        assert_eq!(servo.pulse_width, 1200);
        assert_eq!(servo.settings(), settings);
    }
}
