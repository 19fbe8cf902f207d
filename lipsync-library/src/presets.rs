//! Named servo presets

use crate::files::{read_settings, write_settings, FileError};
use lipsync_engine::ServoSettings;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Saved servo settings keyed by name, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetStore {
    presets: Vec<ServoSettings>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the default presets file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lipsync")
            .join("presets.json")
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Look up a preset without recording a default
    pub fn find(&self, name: &str) -> Option<&ServoSettings> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Look up a preset, recording the default one if the name is unknown
    pub fn get(&mut self, name: &str) -> &ServoSettings {
        let index = match self.presets.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                tracing::warn!(name, "no saved settings for servo, using defaults");
                self.presets.push(ServoSettings::default_named(name));
                self.presets.len() - 1
            }
        };
        &self.presets[index]
    }

    /// Insert or replace the preset with this name
    pub fn set(&mut self, settings: ServoSettings) {
        match self.presets.iter_mut().find(|p| p.name == settings.name) {
            Some(existing) => *existing = settings,
            None => self.presets.push(settings),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ServoSettings> {
        let index = self.presets.iter().position(|p| p.name == name)?;
        Some(self.presets.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServoSettings> {
        self.presets.iter()
    }

    /// Load presets from a settings file
    ///
    /// Later entries replace earlier ones with the same name.
    pub fn load(path: &Path) -> Result<Self, FileError> {
        let file = fs::File::open(path)?;
        let mut store = Self::new();
        for settings in read_settings(BufReader::new(file))? {
            store.set(settings);
        }
        tracing::debug!(path = %path.display(), presets = store.len(), "loaded servo presets");
        Ok(store)
    }

    /// Load presets, or start empty if the file is missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(store) => store,
            Err(FileError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable presets file");
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), FileError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(path)?);
        write_settings(&mut writer, &self.presets)?;
        writer.flush()?;
        tracing::debug!(path = %path.display(), presets = self.len(), "saved servo presets");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jaw() -> ServoSettings {
        ServoSettings {
            name: "jaw".into(),
            channel: 2,
            min_pulse: 800,
            max_pulse: 2200,
        }
    }

    #[test]
    fn test_unknown_name_records_default() {
        let mut store = PresetStore::new();
        let settings = store.get("brow").clone();
        assert_eq!(settings, ServoSettings::default_named("brow"));
        assert_eq!(settings.channel, -1);
        assert_eq!((settings.min_pulse, settings.max_pulse), (500, 2500));
        assert_eq!(store.names(), vec!["brow"]);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut store = PresetStore::new();
        store.set(jaw());
        store.set(ServoSettings::default_named("brow"));
        store.set(ServoSettings {
            channel: 7,
            ..jaw()
        });
        assert_eq!(store.names(), vec!["jaw", "brow"]);
        assert_eq!(store.get("jaw").channel, 7);
    }

    #[test]
    fn test_remove() {
        let mut store = PresetStore::new();
        store.set(jaw());
        assert_eq!(store.remove("jaw"), Some(jaw()));
        assert_eq!(store.remove("jaw"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("presets.json");

        let mut store = PresetStore::new();
        store.set(jaw());
        store.set(ServoSettings::default_named("brow"));
        store.save(&path).unwrap();

        let loaded = PresetStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::load_or_default(&dir.path().join("none.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_rejects_sequence_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        fs::write(
            &path,
            r#"{"fileType":"servo-sequence","schemaVersion":"0.1","data":{"sequence":[]}}"#,
        )
        .unwrap();
        assert!(matches!(PresetStore::load(&path), Err(FileError::WrongType { .. })));
    }
}
