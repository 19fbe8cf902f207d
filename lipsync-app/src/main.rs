//! lipsync - audio-driven servo lip sync
//!
//! `run` decodes a track, turns its loudness into a servo sequence, optionally
//! saves it, and plays it to a serial servo controller in time with the audio.
//! `test` moves a single servo through a test pattern.

mod audio;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lipsync_analysis::EnvelopeExtractor;
use lipsync_engine::{
    check_channel, generate_with, AudioTransport, CommandWriter, NullTransport, PlaybackDriver, PlaybackEvent,
    RandomBoostRange, RngSource, Sequence, SequenceOptions, Servo, ServoError, ServoSet, ServoSettings, ServoTester,
    SystemClock, TestPattern, TEST_STEP_INTERVAL_MS, UNASSIGNED_CHANNEL,
};
use lipsync_library::{suggested_file_name, write_sequence, Config, DecodedAudio, PresetStore, TrackLoader};

use audio::CpalTransport;

#[derive(Parser, Debug)]
#[command(name = "lipsync", version, about = "Drive a servo from the loudness of a track")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a servo sequence from a track and play it
    Run(RunArgs),
    /// Move one servo through a test pattern
    Test(TestArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Audio file to generate the sequence from
    track: PathBuf,

    /// Envelope sample size in milliseconds
    #[arg(long)]
    sample_size: Option<u32>,

    /// Saved servo preset to take channel and pulse limits from
    #[arg(long)]
    preset: Option<String>,

    /// Servo controller channel
    #[arg(long, allow_negative_numbers = true)]
    channel: Option<i32>,

    /// Serial device to play on; omit to only generate
    #[arg(long)]
    port: Option<PathBuf>,

    /// Milliseconds into the track to start playback
    #[arg(long, default_value_t = 0)]
    start_at: u64,

    /// Write the sequence to this file
    #[arg(long, conflicts_with = "save_dir")]
    output: Option<PathBuf>,

    /// Write the sequence into this directory under a generated name
    #[arg(long)]
    save_dir: Option<PathBuf>,

    #[arg(long)]
    floor: Option<i32>,

    #[arg(long)]
    ceiling: Option<i32>,

    #[arg(long)]
    inverted: bool,

    /// Use raw amplitudes instead of normalizing
    #[arg(long)]
    raw: bool,

    /// Pulse width added to quiet samples
    #[arg(long)]
    floor_boost: Option<i32>,

    /// Randomize unchanged samples with this strategy
    #[arg(long, value_parser = parse_range_boost)]
    randomize: Option<RandomBoostRange>,

    /// Size the 0-25 bucket's randomization as 0-50
    #[arg(long)]
    widen_quarter: bool,

    /// Seed for repeatable randomization
    #[arg(long)]
    seed: Option<u64>,

    /// Play without audio
    #[arg(long)]
    mute: bool,

    /// Log clamped and invalid pulse widths
    #[arg(long)]
    verbose_errors: bool,

    /// Log every generated event
    #[arg(long)]
    verbose_debug: bool,

    /// Keep these settings as the defaults for later runs
    #[arg(long)]
    save_config: bool,
}

#[derive(Args, Debug)]
struct TestArgs {
    #[arg(long, value_parser = parse_test_pattern, default_value = "sweep")]
    pattern: TestPattern,

    /// Saved servo preset to take channel and pulse limits from
    #[arg(long)]
    preset: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    channel: Option<i32>,

    #[arg(long)]
    min: Option<i32>,

    #[arg(long)]
    max: Option<i32>,

    /// Pulse width to start from, the servo's minimum by default
    #[arg(long)]
    start: Option<i32>,

    /// Serial device the controller is on
    #[arg(long)]
    port: Option<PathBuf>,

    /// Stop after this many steps instead of running until interrupted
    #[arg(long)]
    steps: Option<u64>,

    /// Seed for the random pattern
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_range_boost(s: &str) -> Result<RandomBoostRange, String> {
    s.parse().map_err(|e: lipsync_engine::UnknownRangeBoost| {
        let labels: Vec<_> = RandomBoostRange::ALL.iter().map(|r| r.label()).collect();
        format!("{e}; expected one of {labels:?}")
    })
}

fn parse_test_pattern(s: &str) -> Result<TestPattern, String> {
    s.parse().map_err(|e: lipsync_engine::UnknownTestPattern| {
        let labels: Vec<_> = TestPattern::ALL.iter().map(|p| p.label()).collect();
        format!("{e}; expected one of {labels:?}")
    })
}

impl RunArgs {
    /// Command line flags take precedence over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(ms) = self.sample_size {
            config.sample_size_ms = ms;
        }
        if let Some(channel) = self.channel {
            config.channel = channel;
        }
        if let Some(ref port) = self.port {
            config.serial_port = Some(port.clone());
        }

        let opts = &mut config.sequence;
        if let Some(floor) = self.floor {
            opts.servo_floor = floor;
        }
        if let Some(ceiling) = self.ceiling {
            opts.servo_ceiling = ceiling;
        }
        if self.inverted {
            opts.inverted = true;
        }
        if self.raw {
            opts.use_normalized_amplitude = false;
        }
        if let Some(boost) = self.floor_boost {
            opts.servo_floor_boost = boost;
        }
        if let Some(strategy) = self.randomize {
            opts.no_change_randomize = true;
            opts.no_change_randomize_range_boost = strategy;
        }
        if self.widen_quarter {
            opts.boost_no_change_level_25 = true;
        }
        if self.verbose_errors {
            opts.verbose_error = true;
        }
        if self.verbose_debug {
            opts.verbose_debugging = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Command::Run(args) => run(&args, config),
        Command::Test(args) => run_test(&args, &config),
    }
}

fn load_preset(name: &str) -> anyhow::Result<ServoSettings> {
    let presets = PresetStore::load_or_default(&PresetStore::default_path());
    match presets.find(name) {
        Some(settings) => Ok(settings.clone()),
        None => bail!("No servo preset named {name:?}"),
    }
}

fn run(args: &RunArgs, mut config: Config) -> anyhow::Result<()> {
    // Preset limits first so explicit flags still win
    if let Some(ref name) = args.preset {
        let servo = load_preset(name)?.to_servo();
        config.sequence = config.sequence.clone().with_servo_bounds(&servo);
        config.channel = servo.channel;
    }
    args.apply(&mut config);

    if args.save_config {
        config
            .save()
            .with_context(|| format!("Failed to save {}", Config::config_path().display()))?;
        tracing::info!(path = %Config::config_path().display(), "saved settings");
    }

    let audio = Arc::new(
        TrackLoader::new()
            .load(&args.track)
            .with_context(|| format!("Failed to load {}", args.track.display()))?,
    );
    let sequence = Arc::new(build_sequence(&audio, &config, args.seed)?);

    if let Some(ref path) = args.output {
        save_sequence(path, &sequence)?;
    } else if let Some(ref dir) = args.save_dir {
        let name = suggested_file_name(args.preset.as_deref().unwrap_or("servo"), &timestamp());
        save_sequence(&dir.join(name), &sequence)?;
    }

    match config.serial_port.clone() {
        Some(port) => play(&port, &config, sequence, audio, args.start_at, args.mute),
        None => {
            tracing::info!("no serial port configured, not playing");
            Ok(())
        }
    }
}

/// Channel to drive, refusing unassigned and unaddressable ones
fn playback_channel(channel: i32) -> anyhow::Result<i32> {
    if channel == UNASSIGNED_CHANNEL {
        bail!("No servo channel set; pass --channel or a preset with a channel");
    }
    Ok(check_channel(channel)?)
}

/// Servo to test: preset or configured limits, then explicit flags
fn test_servo(args: &TestArgs, config: &Config, preset: Option<&ServoSettings>) -> Servo {
    let mut servo = match preset {
        Some(settings) => settings.to_servo(),
        None => Servo {
            channel: config.channel,
            min_pulse: config.sequence.servo_floor,
            max_pulse: config.sequence.servo_ceiling,
            pulse_width: config.sequence.servo_floor,
            name: None,
        },
    };
    if let Some(channel) = args.channel {
        servo.channel = channel;
    }
    if let Some(min) = args.min {
        servo.min_pulse = min;
    }
    if let Some(max) = args.max {
        servo.max_pulse = max;
    }
    servo.pulse_width = args.start.unwrap_or(servo.min_pulse);
    servo
}

fn run_test(args: &TestArgs, config: &Config) -> anyhow::Result<()> {
    let preset = args.preset.as_deref().map(load_preset).transpose()?;
    let servo = test_servo(args, config, preset.as_ref());
    playback_channel(servo.channel)?;

    let Some(port) = args.port.clone().or_else(|| config.serial_port.clone()) else {
        bail!("No serial port configured; pass --port");
    };

    let mut set = ServoSet::new();
    let servo = set.change(0, servo).context("Invalid test servo")?.clone();
    let mut tester = ServoTester::start(args.pattern, &servo)?;

    let serial = OpenOptions::new()
        .write(true)
        .open(&port)
        .with_context(|| format!("Failed to open serial port {}", port.display()))?;
    let writer = CommandWriter::new(serial);
    writer
        .send(&servo.command())
        .with_context(|| format!("Failed to write to {}", port.display()))?;

    let mut rng = match args.seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_entropy(),
    };

    tracing::info!(
        pattern = %args.pattern,
        channel = servo.channel,
        min = servo.min_pulse,
        max = servo.max_pulse,
        "testing servo"
    );
    let interval = Duration::from_millis(TEST_STEP_INTERVAL_MS);
    let mut step = 0;
    while args.steps.map_or(true, |limit| step < limit) {
        thread::sleep(interval);
        match set.step_test(0, &mut tester, &mut rng, &writer) {
            Ok(servo) => tracing::debug!(step, pulse_width = servo.pulse_width, "test step"),
            Err(e @ ServoError::Send(_)) => return Err(e).context("Test pattern stopped"),
            Err(e) => tracing::warn!(step, error = %e, "test step rejected"),
        }
        step += 1;
    }
    Ok(())
}

fn build_sequence(audio: &DecodedAudio, config: &Config, seed: Option<u64>) -> anyhow::Result<Sequence> {
    let envelope = audio.envelope(&EnvelopeExtractor::new(config.sample_size_ms));
    let options: SequenceOptions = config.sequence_options();

    let sequence = match seed {
        Some(seed) => generate_with(&envelope, &options, &mut RngSource::seeded(seed)),
        None => generate_with(&envelope, &options, &mut RngSource::from_entropy()),
    }
    .context("Failed to generate servo sequence")?;

    tracing::info!(
        events = sequence.len(),
        duration_ms = sequence.duration_ms(),
        min = sequence.stats.min,
        max = sequence.stats.max,
        max_no_change_samples = sequence.stats.max_no_change_samples,
        "generated servo sequence"
    );
    for (error, count) in sequence.stats.errors.iter() {
        tracing::warn!(%error, count, "pulse width corrections");
    }
    Ok(sequence)
}

fn save_sequence(path: &Path, sequence: &Sequence) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_sequence(&mut writer, sequence)
        .and_then(|_| writer.flush().map_err(Into::into))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "saved servo sequence");
    Ok(())
}

fn play(
    port: &Path,
    config: &Config,
    sequence: Arc<Sequence>,
    audio: Arc<DecodedAudio>,
    start_at_ms: u64,
    mute: bool,
) -> anyhow::Result<()> {
    let channel = playback_channel(config.channel)?;

    let serial = OpenOptions::new()
        .write(true)
        .open(port)
        .with_context(|| format!("Failed to open serial port {}", port.display()))?;
    let writer = CommandWriter::new(serial);

    let transport: Box<dyn AudioTransport + Send> = if mute {
        Box::new(NullTransport)
    } else {
        match CpalTransport::open(audio) {
            Ok(transport) => Box::new(transport),
            Err(e) => {
                tracing::warn!(error = %e, "audio unavailable, playing servo only");
                Box::new(NullTransport)
            }
        }
    };

    let driver = PlaybackDriver::spawn(writer, SystemClock::new(), transport);
    driver.play(sequence.clone(), channel, start_at_ms);

    // Generous bound in case the playback thread dies without reporting
    let deadline = Duration::from_millis(sequence.duration_ms().saturating_sub(start_at_ms)) + Duration::from_secs(30);
    loop {
        match driver.event_rx.recv_timeout(deadline) {
            Ok(PlaybackEvent::Started { offset }) => tracing::debug!(offset, "playback started"),
            Ok(PlaybackEvent::Corrected(correction)) => tracing::debug!(?correction, "playback corrected"),
            Ok(PlaybackEvent::Finished) | Ok(PlaybackEvent::Stopped) => break,
            Ok(PlaybackEvent::Failed(e)) => bail!("Playback failed: {e}"),
            Err(_) => bail!("Playback thread stopped responding"),
        }
    }

    driver.shutdown();
    Ok(())
}

fn timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string()
}
