//! Envelope to servo sequence generation

use crate::options::SequenceOptions;
use crate::random::{RandomSource, RngSource};
use crate::stats::{AmplitudeBucket, SequenceStats, StatError, StatsAccumulator};
use lipsync_analysis::Envelope;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors rejected before any sample is generated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Servo floor {floor} is above servo ceiling {ceiling}")]
    InvertedBounds { floor: i32, ceiling: i32 },
}

/// A pulse width and when (relative to start) it should be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleEvent {
    /// Milliseconds since the start of the sequence
    pub since_start: u64,
    pub pulse_width: i32,
}

/// Timed servo positions generated from one envelope and option set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(rename = "sequence")]
    pub events: Vec<SimpleEvent>,
    /// Options the sequence was generated with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SequenceOptions>,
    #[serde(default)]
    pub stats: SequenceStats,
    /// Spacing between events in milliseconds
    #[serde(skip, default = "default_sample_size")]
    pub sample_size_ms: u32,
}

fn default_sample_size() -> u32 {
    lipsync_analysis::DEFAULT_SAMPLE_SIZE_MS
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SimpleEvent> {
        self.events.get(index)
    }

    /// Total playback time in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.events
            .last()
            .map(|e| e.since_start + self.sample_size_ms as u64)
            .unwrap_or(0)
    }
}

/// Generate a sequence using an OS-seeded random source
pub fn generate(envelope: &Envelope, options: &SequenceOptions) -> Result<Sequence, SequenceError> {
    generate_with(envelope, options, &mut RngSource::from_entropy())
}

/// Generate a sequence drawing perturbations from `rng`
///
/// Emits a leading event at the servo floor, then one event per envelope
/// sample after the first. Every pulse width lies within
/// `[servo_floor, servo_ceiling]`. An empty envelope yields an empty sequence.
pub fn generate_with<R: RandomSource + ?Sized>(
    envelope: &Envelope,
    options: &SequenceOptions,
    rng: &mut R,
) -> Result<Sequence, SequenceError> {
    let floor = options.servo_floor;
    let ceiling = options.servo_ceiling;
    if floor > ceiling {
        return Err(SequenceError::InvertedBounds { floor, ceiling });
    }

    let sample_size_ms = envelope.sample_size_ms();
    if envelope.is_empty() {
        tracing::debug!("empty envelope, no sequence generated");
        return Ok(Sequence {
            options: Some(options.clone()),
            sample_size_ms,
            ..Sequence::default()
        });
    }

    let working = if options.use_normalized_amplitude {
        envelope.normalized()
    } else {
        envelope.clone()
    };
    let amplitudes = working.values();
    let min = working.min().unwrap_or(0.0);
    let max = working.max().unwrap_or(0.0);
    let range = options.range() as f64;

    let mut stats = StatsAccumulator::new(min, max, AmplitudeBucket::classify(amplitudes[0] as f64, min as f64));
    let mut events = Vec::with_capacity(amplitudes.len());
    events.push(SimpleEvent {
        since_start: 0,
        pulse_width: floor,
    });

    for i in 1..amplitudes.len() {
        let amplitude = amplitudes[i] as f64;
        let bucket = AmplitudeBucket::classify(amplitude, min as f64);
        let transition = stats.observe(bucket);

        let mut delta = (amplitude * range).round();

        let randomized = if options.no_change_randomize
            && transition.is_no_change()
            && bucket.is_randomizable()
        {
            // `other` has no level range; its perturbation is non-finite
            let range = bucket
                .level_range(options.boost_no_change_level_25)
                .map(|(min_level, max_level)| (max_level - min_level) as f64)
                .unwrap_or(f64::NAN);
            let falling = amplitude < amplitudes[i - 1] as f64;
            Some(
                options
                    .no_change_randomize_range_boost
                    .perturb(range, falling, rng),
            )
        } else {
            None
        };

        match randomized {
            Some(boost) => delta += boost,
            None => {
                if options.servo_floor_boost > 0
                    && amplitude > options.floor_boost_min_amplitude as f64
                    && amplitude <= options.floor_boost_max_amplitude as f64
                {
                    delta += options.servo_floor_boost as f64;
                }
            }
        }

        if !delta.is_finite() {
            stats.error(StatError::NonFinite);
            if options.verbose_error {
                tracing::warn!(sample = i, amplitude, "non-finite pulse width delta, using 0");
            }
            delta = 0.0;
        }

        let unclamped = if options.inverted {
            (ceiling as f64 - delta).floor()
        } else {
            (floor as f64 + delta).ceil()
        };

        let pulse_width = if unclamped < floor as f64 {
            stats.error(StatError::BelowFloor);
            if options.verbose_error {
                tracing::warn!(sample = i, unclamped, floor, "pulse width below floor");
            }
            floor
        } else if unclamped > ceiling as f64 {
            stats.error(StatError::AboveCeiling);
            if options.verbose_error {
                tracing::warn!(sample = i, unclamped, ceiling, "pulse width above ceiling");
            }
            ceiling
        } else {
            unclamped as i32
        };

        if options.verbose_debugging {
            tracing::debug!(
                sample = i,
                amplitude,
                %bucket,
                %transition,
                delta,
                pulse_width,
                "generated servo event"
            );
        }

        events.push(SimpleEvent {
            since_start: i as u64 * sample_size_ms as u64,
            pulse_width,
        });
    }

    let stats = stats.finish();
    tracing::debug!(
        events = events.len(),
        max_no_change = stats.max_no_change_samples,
        errors = stats.errors.total(),
        "servo sequence generated"
    );

    Ok(Sequence {
        events,
        options: Some(options.clone()),
        stats,
        sample_size_ms,
    })
}
