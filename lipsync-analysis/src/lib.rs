//! Audio analysis for lipsync
//!
//! Reduces decoded PCM into a coarse loudness envelope that the sequence
//! generator turns into servo motion.

mod envelope;

pub use envelope::{Envelope, EnvelopeExtractor, DEFAULT_SAMPLE_SIZE_MS};
