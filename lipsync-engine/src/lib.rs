//! Sequencing engine for lipsync - servo sequences, channels, and playback
//!
//! This crate turns a loudness envelope into servo motion:
//! - Sequence: envelope to pulse-width events with run statistics
//! - Servo: per-servo settings, channel allocation, and test patterns
//! - Wire: the controller's ASCII command format
//! - Playback: drift-corrected real-time playback on its own thread

mod clock;
mod options;
mod playback;
mod random;
mod sequence;
mod servo;
mod stats;
mod wire;

pub use clock::{Clock, ManualClock, SystemClock};
pub use options::{RandomBoostRange, SequenceOptions, UnknownRangeBoost};
pub use playback::{
    AudioTransport, DriftCorrection, NullTransport, PlaybackCommand, PlaybackCursor, PlaybackDriver,
    PlaybackError, PlaybackEvent, PlaybackScheduler, PlaybackState, TickOutcome, CHECKPOINT_INTERVAL_MS,
};
pub use random::{RandomSource, RngSource};
pub use sequence::{generate, generate_with, Sequence, SequenceError, SimpleEvent};
pub use servo::{
    check_channel, validate, Servo, ServoError, ServoSet, ServoSettings, ServoTester, TestPattern, UnknownTestPattern,
    FAST_SWEEP_STEP, MAX_CHANNEL, SWEEP_POINTS_DWELL, TEST_STEP_INTERVAL_MS, UNASSIGNED_CHANNEL,
};
pub use stats::{AmplitudeBucket, SequenceStats, StatError, Tally, Transition};
pub use wire::{CommandWriter, ServoCommand};
