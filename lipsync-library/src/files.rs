//! Saved sequence and servo settings files
//!
//! Both are pretty-printed JSON wrapped in a small header:
//!
//! ```text
//! { "fileType": "servo-sequence", "schemaVersion": "0.1", "data": { ... } }
//! ```

use lipsync_engine::{Sequence, ServoSettings};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

pub const SEQUENCE_FILE_TYPE: &str = "servo-sequence";
pub const SEQUENCE_SCHEMA_VERSION: &str = "0.1";
pub const SETTINGS_FILE_TYPE: &str = "servo-settings";
pub const SETTINGS_SCHEMA_VERSION: &str = "1.0";

/// Errors reading or writing saved files
#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a {expected:?} file, found {found:?}")]
    WrongType { expected: &'static str, found: String },
    #[error("Unsupported {file_type:?} schema version {found:?}, expected {expected:?}")]
    WrongVersion {
        file_type: &'static str,
        expected: &'static str,
        found: String,
    },
}

/// File header plus payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFile<T> {
    pub file_type: String,
    pub schema_version: String,
    pub data: T,
}

impl<T> ArtifactFile<T> {
    fn new(file_type: &str, schema_version: &str, data: T) -> Self {
        Self {
            file_type: file_type.to_string(),
            schema_version: schema_version.to_string(),
            data,
        }
    }

    fn check(self, file_type: &'static str, schema_version: &'static str) -> Result<T, FileError> {
        if self.file_type != file_type {
            return Err(FileError::WrongType {
                expected: file_type,
                found: self.file_type,
            });
        }
        if self.schema_version != schema_version {
            return Err(FileError::WrongVersion {
                file_type,
                expected: schema_version,
                found: self.schema_version,
            });
        }
        Ok(self.data)
    }
}

/// Header fields only, so the type can be checked before the payload is parsed
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    file_type: String,
    schema_version: String,
    data: serde_json::Value,
}

fn read_checked<R, T>(reader: R, file_type: &'static str, schema_version: &'static str) -> Result<T, FileError>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let header: Header = serde_json::from_reader(reader)?;
    let data = ArtifactFile::new(&header.file_type, &header.schema_version, header.data)
        .check(file_type, schema_version)?;
    Ok(serde_json::from_value(data)?)
}

pub fn write_sequence<W: Write>(writer: W, sequence: &Sequence) -> Result<(), FileError> {
    let file = ArtifactFile::new(SEQUENCE_FILE_TYPE, SEQUENCE_SCHEMA_VERSION, sequence);
    serde_json::to_writer_pretty(writer, &file)?;
    Ok(())
}

/// Read a saved sequence
///
/// Event spacing is not stored; it is recovered from the first two events.
pub fn read_sequence<R: Read>(reader: R) -> Result<Sequence, FileError> {
    let mut sequence: Sequence = read_checked(reader, SEQUENCE_FILE_TYPE, SEQUENCE_SCHEMA_VERSION)?;
    if let [first, second, ..] = sequence.events.as_slice() {
        let spacing = second.since_start.saturating_sub(first.since_start);
        if spacing > 0 {
            sequence.sample_size_ms = spacing as u32;
        }
    }
    Ok(sequence)
}

pub fn write_settings<W: Write>(writer: W, settings: &[ServoSettings]) -> Result<(), FileError> {
    let file = ArtifactFile::new(SETTINGS_FILE_TYPE, SETTINGS_SCHEMA_VERSION, settings);
    serde_json::to_writer_pretty(writer, &file)?;
    Ok(())
}

pub fn read_settings<R: Read>(reader: R) -> Result<Vec<ServoSettings>, FileError> {
    read_checked(reader, SETTINGS_FILE_TYPE, SETTINGS_SCHEMA_VERSION)
}

/// `<preset>-servo-sequence-<timestamp>.json`
pub fn suggested_file_name(preset: &str, timestamp: &str) -> String {
    let preset = preset.trim();
    let preset = if preset.is_empty() { "servo" } else { preset };
    format!("{preset}-{SEQUENCE_FILE_TYPE}-{timestamp}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lipsync_analysis::Envelope;
    use lipsync_engine::{generate, SequenceOptions};

    fn sample_sequence() -> Sequence {
        let envelope = Envelope::new(vec![0.0, 0.2, 0.6, 1.0, 0.6], 40);
        generate(&envelope, &SequenceOptions::default()).unwrap()
    }

    #[test]
    fn test_sequence_file_layout() {
        let mut out = Vec::new();
        write_sequence(&mut out, &sample_sequence()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(json["fileType"], "servo-sequence");
        assert_eq!(json["schemaVersion"], "0.1");
        let events = json["data"]["sequence"].as_array().unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0]["sinceStart"], 0);
        assert_eq!(events[0]["pulseWidth"], 500);
        assert_eq!(events[1]["sinceStart"], 40);
        assert_eq!(json["data"]["options"]["servoFloor"], 500);
        assert!(json["data"]["stats"].is_object());
        // pretty printed
        assert!(out.contains(&b'\n'));
    }

    #[test]
    fn test_sequence_read_back() {
        let sequence = sample_sequence();
        let mut out = Vec::new();
        write_sequence(&mut out, &sequence).unwrap();
        let read = read_sequence(out.as_slice()).unwrap();
        assert_eq!(read.events, sequence.events);
        assert_eq!(read.options, sequence.options);
        assert_eq!(read.sample_size_ms, 40);
    }

    #[test]
    fn test_settings_read_back() {
        let settings = vec![
            ServoSettings::default_named("jaw"),
            ServoSettings {
                name: "brow".into(),
                channel: 3,
                min_pulse: 900,
                max_pulse: 2100,
            },
        ];
        let mut out = Vec::new();
        write_settings(&mut out, &settings).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["fileType"], "servo-settings");
        assert_eq!(json["schemaVersion"], "1.0");
        assert_eq!(json["data"][1]["minPulse"], 900);

        assert_eq!(read_settings(out.as_slice()).unwrap(), settings);
    }

    #[test]
    fn test_wrong_file_type_rejected() {
        let mut out = Vec::new();
        write_sequence(&mut out, &sample_sequence()).unwrap();
        let err = read_settings(out.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            FileError::WrongType {
                expected: "servo-settings",
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_schema_version_rejected() {
        let json = r#"{"fileType":"servo-settings","schemaVersion":"2.0","data":[]}"#;
        let err = read_settings(json.as_bytes()).unwrap_err();
        assert!(matches!(err, FileError::WrongVersion { ref found, .. } if found == "2.0"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(read_settings(&b"{"[..]), Err(FileError::Json(_))));
    }

    #[test]
    fn test_suggested_file_name() {
        assert_eq!(
            suggested_file_name("jaw", "20240101T120000"),
            "jaw-servo-sequence-20240101T120000.json"
        );
        assert_eq!(suggested_file_name("", "1"), "servo-servo-sequence-1.json");
    }
}
