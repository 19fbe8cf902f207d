//! Track playback through the default output device

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use lipsync_engine::AudioTransport;
use lipsync_library::DecodedAudio;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

enum AudioCommand {
    Play { offset_ms: u64 },
    Stop,
    Shutdown,
}

/// Read position into the decoded track, `None` when silent
struct Cursor {
    audio: Arc<DecodedAudio>,
    /// Source samples advanced per output frame
    step: f64,
    position: Option<f64>,
}

impl Cursor {
    fn next_sample(&mut self) -> f32 {
        let Some(position) = self.position else {
            return 0.0;
        };
        match self.audio.samples.get(position as usize) {
            Some(sample) => {
                self.position = Some(position + self.step);
                *sample
            }
            None => {
                self.position = None;
                0.0
            }
        }
    }
}

/// Plays the decoded track on its own thread
///
/// The output stream lives on the audio thread; this handle only sends it
/// start and stop requests.
pub struct CpalTransport {
    cmd_tx: Sender<AudioCommand>,
    handle: Option<JoinHandle<()>>,
}

impl CpalTransport {
    /// Open the default output device for `audio`
    pub fn open(audio: Arc<DecodedAudio>) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (ready_tx, ready_rx) = bounded(1);
        let handle = thread::spawn(move || run_audio_thread(audio, cmd_rx, ready_tx));

        ready_rx
            .recv()
            .context("audio thread exited during setup")??;

        Ok(Self {
            cmd_tx,
            handle: Some(handle),
        })
    }
}

impl AudioTransport for CpalTransport {
    fn start(&mut self, offset_ms: u64) {
        let _ = self.cmd_tx.try_send(AudioCommand::Play { offset_ms });
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.try_send(AudioCommand::Stop);
    }
}

impl Drop for CpalTransport {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_audio_thread(
    audio: Arc<DecodedAudio>,
    cmd_rx: Receiver<AudioCommand>,
    ready_tx: Sender<anyhow::Result<()>>,
) {
    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        let _ = ready_tx.send(Err(anyhow!("No audio output device found")));
        return;
    };

    let config = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(anyhow!("Failed to get audio config: {e}")));
            return;
        }
    };

    let output_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let source_rate = audio.sample_rate;

    let cursor = Arc::new(Mutex::new(Cursor {
        audio,
        step: source_rate as f64 / output_rate.max(1) as f64,
        position: None,
    }));
    let cursor_for_callback = cursor.clone();

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            // Never block the real-time thread; output silence on contention
            let Some(mut cursor) = cursor_for_callback.try_lock() else {
                data.fill(0.0);
                return;
            };
            for frame in data.chunks_mut(channels.max(1)) {
                frame.fill(cursor.next_sample());
            }
        },
        |err| {
            tracing::error!(%err, "audio stream error");
        },
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(anyhow!("Failed to create audio stream: {e}")));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(anyhow!("Failed to start audio: {e}")));
        return;
    }
    let _ = ready_tx.send(Ok(()));
    tracing::debug!(output_rate, channels, source_rate, "audio output ready");

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            AudioCommand::Play { offset_ms } => {
                let position = offset_ms as f64 * source_rate as f64 / 1000.0;
                cursor.lock().position = Some(position);
            }
            AudioCommand::Stop => cursor.lock().position = None,
            AudioCommand::Shutdown => break,
        }
    }
}
