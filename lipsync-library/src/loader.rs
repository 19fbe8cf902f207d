//! Audio file loading and decoding

use lipsync_analysis::{Envelope, EnvelopeExtractor};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Errors that can occur during track loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Track has no sample rate")]
    UnknownSampleRate,
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Decoded audio, first channel only
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    /// Samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub duration_ms: f64,
    /// Channel count of the source file
    pub source_channels: u16,
}

impl DecodedAudio {
    pub fn envelope(&self, extractor: &EnvelopeExtractor) -> Envelope {
        extractor.extract(&self.samples, self.sample_rate, self.duration_ms)
    }
}

/// Audio file loader using Symphonia
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackLoader;

impl TrackLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load and decode an audio file
    pub fn load(&self, path: &Path) -> Result<DecodedAudio, LoadError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate.ok_or(LoadError::UnknownSampleRate)?;
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1)
            .max(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut skipped = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "stopped reading packets");
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };

            let spec = *decoded.spec();
            let frame_channels = spec.channels.count().max(1);
            let duration = decoded.capacity() as u64;

            let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend(sample_buf.samples().iter().step_by(frame_channels));
        }

        if skipped > 0 {
            tracing::warn!(skipped, path = %path.display(), "skipped undecodable packets");
        }

        let duration_ms = samples.len() as f64 * 1000.0 / sample_rate as f64;
        tracing::info!(
            path = %path.display(),
            sample_rate,
            channels,
            duration_ms,
            "decoded track"
        );

        Ok(DecodedAudio {
            samples,
            sample_rate,
            duration_ms,
            source_channels: channels,
        })
    }
}
