//! Files for lipsync - audio decoding, saved sequences, presets, and config

mod config;
mod files;
mod loader;
mod presets;

pub use config::Config;
pub use files::{
    read_sequence, read_settings, suggested_file_name, write_sequence, write_settings, ArtifactFile,
    FileError, SEQUENCE_FILE_TYPE, SEQUENCE_SCHEMA_VERSION, SETTINGS_FILE_TYPE, SETTINGS_SCHEMA_VERSION,
};
pub use loader::{DecodedAudio, LoadError, TrackLoader};
pub use presets::PresetStore;
