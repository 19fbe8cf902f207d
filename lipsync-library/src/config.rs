//! Simple configuration persistence for lipsync
//!
//! Stores the serial port, servo channel, sample size, and the sequence
//! options used for generation.

use lipsync_analysis::DEFAULT_SAMPLE_SIZE_MS;
use lipsync_engine::{SequenceOptions, UNASSIGNED_CHANNEL};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Envelope bucket width in milliseconds
    pub sample_size_ms: u32,
    /// Serial device the servo controller is attached to
    pub serial_port: Option<PathBuf>,
    /// Servo channel to play on
    pub channel: i32,
    pub sequence: SequenceOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_size_ms: DEFAULT_SAMPLE_SIZE_MS,
            serial_port: None,
            channel: UNASSIGNED_CHANNEL,
            sequence: SequenceOptions::default(),
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.serialize();
        fs::write(path, content)
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lipsync")
            .join("config.txt")
    }

    /// Options to generate sequences with
    pub fn sequence_options(&self) -> SequenceOptions {
        self.sequence.clone()
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if !config.apply(key, value) {
                tracing::debug!(key, value, "ignoring config entry");
            }
        }

        config
    }

    /// Apply one entry; false if the key is unknown or the value malformed
    fn apply(&mut self, key: &str, value: &str) -> bool {
        let opts = &mut self.sequence;
        match key {
            "sample_size_ms" => set(&mut self.sample_size_ms, value),
            "serial_port" => {
                self.serial_port = (!value.is_empty()).then(|| PathBuf::from(value));
                true
            }
            "channel" => set(&mut self.channel, value),
            "inverted" => set(&mut opts.inverted, value),
            "use_normalized_amplitude" => set(&mut opts.use_normalized_amplitude, value),
            "servo_floor" => set(&mut opts.servo_floor, value),
            "servo_ceiling" => set(&mut opts.servo_ceiling, value),
            "servo_range" => {
                if value.is_empty() {
                    opts.servo_range = None;
                    true
                } else {
                    value.parse().map(|v| opts.servo_range = Some(v)).is_ok()
                }
            }
            "servo_floor_boost" => set(&mut opts.servo_floor_boost, value),
            "floor_boost_min_amplitude" => set(&mut opts.floor_boost_min_amplitude, value),
            "floor_boost_max_amplitude" => set(&mut opts.floor_boost_max_amplitude, value),
            "servo_random_boost" => set(&mut opts.servo_random_boost, value),
            "servo_random_boost_min" => set(&mut opts.servo_random_boost_min, value),
            "servo_random_boost_max" => set(&mut opts.servo_random_boost_max, value),
            "servo_random_boost_min_amplitude" => set(&mut opts.servo_random_boost_min_amplitude, value),
            "servo_random_boost_max_amplitude" => set(&mut opts.servo_random_boost_max_amplitude, value),
            "no_change_randomize" => set(&mut opts.no_change_randomize, value),
            "no_change_randomize_range_boost" => set(&mut opts.no_change_randomize_range_boost, value),
            "boost_no_change_level_25" => set(&mut opts.boost_no_change_level_25, value),
            "verbose_error" => set(&mut opts.verbose_error, value),
            "verbose_debugging" => set(&mut opts.verbose_debugging, value),
            _ => false,
        }
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let opts = &self.sequence;
        let mut lines = vec![
            "# Lipsync Configuration".to_string(),
            format!("sample_size_ms={}", self.sample_size_ms),
        ];

        if let Some(ref port) = self.serial_port {
            lines.push(format!("serial_port={}", port.display()));
        }
        lines.push(format!("channel={}", self.channel));

        lines.push(format!("inverted={}", opts.inverted));
        lines.push(format!("use_normalized_amplitude={}", opts.use_normalized_amplitude));
        lines.push(format!("servo_floor={}", opts.servo_floor));
        lines.push(format!("servo_ceiling={}", opts.servo_ceiling));
        if let Some(range) = opts.servo_range {
            lines.push(format!("servo_range={range}"));
        }
        lines.push(format!("servo_floor_boost={}", opts.servo_floor_boost));
        lines.push(format!("floor_boost_min_amplitude={}", opts.floor_boost_min_amplitude));
        lines.push(format!("floor_boost_max_amplitude={}", opts.floor_boost_max_amplitude));
        lines.push(format!("servo_random_boost={}", opts.servo_random_boost));
        lines.push(format!("servo_random_boost_min={}", opts.servo_random_boost_min));
        lines.push(format!("servo_random_boost_max={}", opts.servo_random_boost_max));
        lines.push(format!(
            "servo_random_boost_min_amplitude={}",
            opts.servo_random_boost_min_amplitude
        ));
        lines.push(format!(
            "servo_random_boost_max_amplitude={}",
            opts.servo_random_boost_max_amplitude
        ));
        lines.push(format!("no_change_randomize={}", opts.no_change_randomize));
        lines.push(format!(
            "no_change_randomize_range_boost={}",
            opts.no_change_randomize_range_boost
        ));
        lines.push(format!("boost_no_change_level_25={}", opts.boost_no_change_level_25));
        lines.push(format!("verbose_error={}", opts.verbose_error));
        lines.push(format!("verbose_debugging={}", opts.verbose_debugging));

        lines.join("\n")
    }
}

fn set<T: FromStr>(slot: &mut T, value: &str) -> bool {
    match value.parse() {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lipsync_engine::RandomBoostRange;

    #[test]
    fn test_parse_empty() {
        let config = Config::parse("");
        assert_eq!(config, Config::default());
        assert_eq!(config.sample_size_ms, 50);
        assert_eq!(config.channel, -1);
    }

    #[test]
    fn test_parse_with_comments() {
        let content = "# Comment\nserial_port=/dev/ttyUSB0\n# Another comment\nchannel=4";
        let config = Config::parse(content);
        assert_eq!(config.serial_port, Some(PathBuf::from("/dev/ttyUSB0")));
        assert_eq!(config.channel, 4);
    }

    #[test]
    fn test_parse_sequence_options() {
        let content = "servo_floor=900\nservo_ceiling = 2100\ninverted=true\n\
                       no_change_randomize=true\nno_change_randomize_range_boost=-range to +range\n\
                       floor_boost_max_amplitude=0.4\nservo_range=1500";
        let opts = Config::parse(content).sequence_options();
        assert_eq!(opts.servo_floor, 900);
        assert_eq!(opts.servo_ceiling, 2100);
        assert!(opts.inverted);
        assert!(opts.no_change_randomize);
        assert_eq!(opts.no_change_randomize_range_boost, RandomBoostRange::FullRange);
        assert_eq!(opts.floor_boost_max_amplitude, 0.4);
        assert_eq!(opts.servo_range, Some(1500));
    }

    #[test]
    fn test_malformed_values_ignored() {
        let content = "servo_floor=lots\nchannel=\ninverted=yes\nwhatever=1\nno_equals_sign";
        let config = Config::parse(content);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut config = Config {
            sample_size_ms: 20,
            serial_port: Some(PathBuf::from("/dev/ttyACM1")),
            channel: 12,
            ..Config::default()
        };
        config.sequence.servo_floor_boost = 150;
        config.sequence.servo_range = Some(1800);
        config.sequence.no_change_randomize_range_boost = RandomBoostRange::HalfRange;
        config.sequence.boost_no_change_level_25 = true;

        let parsed = Config::parse(&config.serialize());
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lipsync").join("config.txt");
        let config = Config {
            channel: 3,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
