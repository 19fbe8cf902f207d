//! Mean-absolute-amplitude envelope of a mono PCM track

/// Default bucket width in milliseconds
pub const DEFAULT_SAMPLE_SIZE_MS: u32 = 50;

/// Loudness envelope of a track
///
/// One value per fixed bucket of `sample_size_ms`; index `i` covers the audio
/// starting at `i * sample_size_ms`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    values: Vec<f32>,
    sample_size_ms: u32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            sample_size_ms: DEFAULT_SAMPLE_SIZE_MS,
        }
    }
}

impl Envelope {
    /// Create an envelope from precomputed bucket values
    pub fn new(values: Vec<f32>, sample_size_ms: u32) -> Self {
        Self { values, sample_size_ms }
    }

    /// Create an empty envelope (audio shorter than one bucket)
    pub fn empty(sample_size_ms: u32) -> Self {
        Self::new(Vec::new(), sample_size_ms)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Bucket width in milliseconds
    pub fn sample_size_ms(&self) -> u32 {
        self.sample_size_ms
    }

    /// Get the number of buckets
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Covered duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.values.len() as u64 * self.sample_size_ms as u64
    }

    /// Smallest bucket value, `None` when empty
    pub fn min(&self) -> Option<f32> {
        self.values.iter().copied().reduce(f32::min)
    }

    /// Largest bucket value, `None` when empty
    pub fn max(&self) -> Option<f32> {
        self.values.iter().copied().reduce(f32::max)
    }

    /// Rescale so the loudest bucket is exactly 1.0
    ///
    /// A silent envelope (peak of 0) normalizes to all zeros instead of NaN.
    pub fn normalized(&self) -> Envelope {
        let peak = self.max().unwrap_or(0.0);
        let values = if peak > 0.0 && peak.is_finite() {
            let multiplier = peak.recip();
            self.values.iter().map(|v| v * multiplier).collect()
        } else {
            vec![0.0; self.values.len()]
        };
        Envelope::new(values, self.sample_size_ms)
    }
}

/// Reduces raw PCM into an [`Envelope`]
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeExtractor {
    sample_size_ms: u32,
}

impl Default for EnvelopeExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE_MS)
    }
}

impl EnvelopeExtractor {
    /// Create an extractor with the given bucket width (clamped to at least 1 ms)
    pub fn new(sample_size_ms: u32) -> Self {
        Self {
            sample_size_ms: sample_size_ms.max(1),
        }
    }

    pub fn sample_size_ms(&self) -> u32 {
        self.sample_size_ms
    }

    /// Extract the envelope of a single channel of linear PCM
    ///
    /// The raw samples are split into `floor(duration_ms / sample_size)` equal
    /// blocks; samples past the last full block are dropped. Each bucket is the
    /// mean absolute value of its block.
    pub fn extract(&self, samples: &[f32], sample_rate: u32, duration_ms: f64) -> Envelope {
        let buckets = if duration_ms.is_finite() && duration_ms > 0.0 {
            (duration_ms / self.sample_size_ms as f64).floor() as usize
        } else {
            0
        };

        tracing::debug!(
            raw_len = samples.len(),
            sample_rate,
            duration_ms,
            buckets,
            "extracting envelope"
        );

        if buckets == 0 {
            return Envelope::empty(self.sample_size_ms);
        }

        let block_size = samples.len() / buckets;
        if block_size == 0 {
            // Fewer raw samples than buckets: nothing to average
            return Envelope::new(vec![0.0; buckets], self.sample_size_ms);
        }

        let values = samples
            .chunks_exact(block_size)
            .take(buckets)
            .map(|block| block.iter().map(|s| s.abs()).sum::<f32>() / block_size as f32)
            .collect();

        Envelope::new(values, self.sample_size_ms)
    }

    /// Extract using the sample count and rate to derive the duration
    pub fn extract_with_rate(&self, samples: &[f32], sample_rate: u32) -> Envelope {
        if sample_rate == 0 {
            return Envelope::empty(self.sample_size_ms);
        }
        let duration_ms = samples.len() as f64 * 1000.0 / sample_rate as f64;
        self.extract(samples, sample_rate, duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_count_follows_duration() {
        // 1 second at 1 kHz, 50 ms buckets
        let samples = vec![0.5f32; 1000];
        let env = EnvelopeExtractor::new(50).extract(&samples, 1000, 1000.0);
        assert_eq!(env.len(), 20);
        assert!(env.values().iter().all(|v| (*v - 0.5).abs() < 1e-6));
        assert_eq!(env.duration_ms(), 1000);
    }

    #[test]
    fn test_mean_absolute_value_per_block() {
        let samples = [1.0f32, -1.0, 0.5, -0.5, 0.0, 0.0, 0.25, -0.75];
        let env = EnvelopeExtractor::new(10).extract(&samples, 200, 40.0);
        assert_eq!(env.values(), &[1.0, 0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_tail_samples_discarded() {
        // 3 buckets over 10 samples: block size 3, last sample ignored
        let samples = [0.1f32, 0.1, 0.1, 0.2, 0.2, 0.2, 0.3, 0.3, 0.3, 9.0];
        let env = EnvelopeExtractor::new(10).extract(&samples, 300, 30.0);
        assert_eq!(env.len(), 3);
        assert!((env.values()[2] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_shorter_than_one_bucket_is_empty() {
        let samples = vec![0.9f32; 40];
        let env = EnvelopeExtractor::new(50).extract(&samples, 1000, 40.0);
        assert!(env.is_empty());
        assert_eq!(env.min(), None);
    }

    #[test]
    fn test_extract_with_rate() {
        let samples = vec![0.25f32; 44100];
        let env = EnvelopeExtractor::default().extract_with_rate(&samples, 44100);
        assert_eq!(env.len(), 20);
    }

    #[test]
    fn test_normalize_peak_is_one() {
        let env = Envelope::new(vec![0.1, 0.4, 0.2], 50);
        let norm = env.normalized();
        assert_eq!(norm.max(), Some(1.0));
        assert!((norm.values()[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_silence_is_zero() {
        let env = Envelope::new(vec![0.0; 5], 50);
        let norm = env.normalized();
        assert_eq!(norm.values(), &[0.0; 5]);
        assert!(norm.values().iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(Envelope::empty(25).normalized().is_empty());
    }
}
