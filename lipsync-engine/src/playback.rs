//! Real-time sequence playback
//!
//! [`PlaybackScheduler`] walks a [`Sequence`] one event per tick, checking
//! every ten seconds of sequence time that it has not drifted from the wall
//! clock. [`PlaybackDriver`] runs a scheduler on its own thread at the
//! sequence's sample period and is controlled over a command channel.

use crate::clock::Clock;
use crate::sequence::Sequence;
use crate::servo::UNASSIGNED_CHANNEL;
use crate::wire::{CommandWriter, ServoCommand};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Sequence time between drift checks
pub const CHECKPOINT_INTERVAL_MS: u64 = 10_000;

/// Errors that end a playback session
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to send servo command {command:?}: {source}")]
    Write {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Cannot play on an unassigned channel")]
    Unassigned,
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// Position of a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    /// Index of the next event to send
    pub offset: i64,
    /// Clock reading when playback started
    pub started_at_ms: u64,
    /// Sequence time of the first event played
    origin_ms: u64,
}

/// Jump applied at a checkpoint to pull playback back onto the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftCorrection {
    /// Ahead of the clock; step back and replay samples
    Replay { ahead_ms: i64, samples: i64 },
    /// Behind the clock; skip samples
    Skip { behind_ms: i64, samples: i64 },
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A command was written
    Sent {
        index: usize,
        command: ServoCommand,
        correction: Option<DriftCorrection>,
    },
    /// Ran off the end of the sequence; now stopped
    Finished,
    /// Nothing playing
    Idle,
}

/// Audio playback kept in step with servo playback
pub trait AudioTransport {
    /// Begin playing from `offset_ms` into the track
    fn start(&mut self, offset_ms: u64);
    fn stop(&mut self);
}

impl<T: AudioTransport + ?Sized> AudioTransport for Box<T> {
    fn start(&mut self, offset_ms: u64) {
        (**self).start(offset_ms);
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}

/// Transport for headless playback
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl AudioTransport for NullTransport {
    fn start(&mut self, _offset_ms: u64) {}
    fn stop(&mut self) {}
}

/// Steps through a sequence, one event per tick
pub struct PlaybackScheduler<C> {
    sequence: Arc<Sequence>,
    channel: i32,
    clock: C,
    checkpoint_interval_ms: u64,
    cursor: Option<PlaybackCursor>,
}

impl<C: Clock> PlaybackScheduler<C> {
    pub fn new(sequence: Arc<Sequence>, channel: i32, clock: C) -> Self {
        Self {
            sequence,
            channel,
            clock,
            checkpoint_interval_ms: CHECKPOINT_INTERVAL_MS,
            cursor: None,
        }
    }

    pub fn with_checkpoint_interval(mut self, interval_ms: u64) -> Self {
        self.checkpoint_interval_ms = interval_ms.max(1);
        self
    }

    pub fn state(&self) -> PlaybackState {
        if self.cursor.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    pub fn cursor(&self) -> Option<PlaybackCursor> {
        self.cursor
    }

    pub fn sample_size_ms(&self) -> u32 {
        self.sequence.sample_size_ms.max(1)
    }

    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.sequence
    }

    /// Start (or restart) playback at `start_at_ms` into the sequence
    ///
    /// Returns the index of the first event that will be sent.
    pub fn start(&mut self, start_at_ms: u64) -> Result<usize, PlaybackError> {
        if self.channel == UNASSIGNED_CHANNEL {
            return Err(PlaybackError::Unassigned);
        }
        let sample_size = self.sample_size_ms() as u64;
        let offset = start_at_ms / sample_size;
        self.cursor = Some(PlaybackCursor {
            offset: offset as i64,
            started_at_ms: self.clock.now_ms(),
            origin_ms: offset * sample_size,
        });
        tracing::info!(
            channel = self.channel,
            offset,
            events = self.sequence.len(),
            "playing servo sequence"
        );
        Ok(offset as usize)
    }

    pub fn stop(&mut self) {
        if self.cursor.take().is_some() {
            tracing::info!("stopping servo sequence");
        }
    }

    /// Send the current event and advance
    ///
    /// A failed write stops playback and is returned; it is never retried.
    pub fn tick<W: Write>(&mut self, out: &CommandWriter<W>) -> Result<TickOutcome, PlaybackError> {
        let Some(cursor) = self.cursor else {
            return Ok(TickOutcome::Idle);
        };

        let index = match usize::try_from(cursor.offset) {
            Ok(index) if index < self.sequence.len() => index,
            _ => {
                tracing::info!("servo playback has reached the end of the sequence");
                self.cursor = None;
                return Ok(TickOutcome::Finished);
            }
        };

        let event = self.sequence.events[index];
        let command = ServoCommand::new(self.channel, event.pulse_width);
        if let Err(source) = out.send(&command) {
            tracing::error!(%source, index, "servo command write failed, stopping playback");
            self.cursor = None;
            return Err(PlaybackError::Write {
                command: command.to_string(),
                source,
            });
        }

        let mut next = cursor.offset + 1;
        let mut correction = None;

        if event.since_start % self.checkpoint_interval_ms == 0 {
            let sample_size = self.sample_size_ms() as i64;
            let elapsed = self.clock.now_ms().saturating_sub(cursor.started_at_ms) as i64;
            let position = event.since_start as i64 - cursor.origin_ms as i64;
            let delta = position - elapsed;
            tracing::info!(
                index,
                since_start = event.since_start,
                elapsed,
                delta,
                pulse_width = event.pulse_width,
                "playback checkpoint"
            );

            if delta > sample_size {
                let samples = delta.div_euclid(sample_size);
                tracing::warn!(ahead_ms = delta, samples, "servo playback ahead, replaying samples");
                next = cursor.offset - samples;
                correction = Some(DriftCorrection::Replay {
                    ahead_ms: delta,
                    samples,
                });
            } else if delta < -sample_size {
                let samples = -delta.div_euclid(sample_size);
                tracing::warn!(behind_ms = -delta, samples, "servo playback behind, skipping samples");
                next = cursor.offset + samples;
                correction = Some(DriftCorrection::Skip {
                    behind_ms: -delta,
                    samples,
                });
            }
        }

        self.cursor = Some(PlaybackCursor {
            offset: next.max(0),
            ..cursor
        });

        Ok(TickOutcome::Sent {
            index,
            command,
            correction,
        })
    }
}

/// Commands sent to the playback thread
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    /// Play a sequence, stopping any session already running
    Start {
        sequence: Arc<Sequence>,
        channel: i32,
        start_at_ms: u64,
    },
    Stop,
    Shutdown,
}

/// Events sent from the playback thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { offset: usize },
    Corrected(DriftCorrection),
    /// Reached the end of the sequence
    Finished,
    /// Stopped on request
    Stopped,
    /// Session ended by an error
    Failed(String),
}

/// Handle to a playback thread
pub struct PlaybackDriver {
    /// Send commands to the playback thread
    pub command_tx: Sender<PlaybackCommand>,
    /// Receive events from the playback thread
    pub event_rx: Receiver<PlaybackEvent>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackDriver {
    /// Spawn a playback thread writing to `writer`
    pub fn spawn<W, C, T>(writer: CommandWriter<W>, clock: C, transport: T) -> Self
    where
        W: Write + Send + 'static,
        C: Clock + Clone + Send + 'static,
        T: AudioTransport + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = bounded(64);
        let (evt_tx, evt_rx) = bounded(1024);
        let handle = thread::spawn(move || {
            run_playback_thread(cmd_rx, evt_tx, writer, clock, transport);
        });
        Self {
            command_tx: cmd_tx,
            event_rx: evt_rx,
            handle: Some(handle),
        }
    }

    /// Send a command to the playback thread
    pub fn send(&self, cmd: PlaybackCommand) {
        let _ = self.command_tx.try_send(cmd);
    }

    pub fn play(&self, sequence: Arc<Sequence>, channel: i32, start_at_ms: u64) {
        self.send(PlaybackCommand::Start {
            sequence,
            channel,
            start_at_ms,
        });
    }

    pub fn stop(&self) {
        self.send(PlaybackCommand::Stop);
    }

    /// Stop playback and wait for the thread to exit
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let _ = self.command_tx.send(PlaybackCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_playback_thread<W, C, T>(
    cmd_rx: Receiver<PlaybackCommand>,
    evt_tx: Sender<PlaybackEvent>,
    writer: CommandWriter<W>,
    clock: C,
    mut transport: T,
) where
    W: Write,
    C: Clock + Clone,
    T: AudioTransport,
{
    let mut session: Option<PlaybackScheduler<C>> = None;
    let mut period = Duration::from_millis(lipsync_analysis::DEFAULT_SAMPLE_SIZE_MS as u64);
    let mut next_tick = Instant::now();

    loop {
        let command = if session.is_some() {
            match cmd_rx.recv_timeout(next_tick.saturating_duration_since(Instant::now())) {
                Ok(cmd) => Some(cmd),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match cmd_rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break,
            }
        };

        match command {
            Some(PlaybackCommand::Start {
                sequence,
                channel,
                start_at_ms,
            }) => {
                if session.take().is_some() {
                    transport.stop();
                    let _ = evt_tx.try_send(PlaybackEvent::Stopped);
                }
                let mut scheduler = PlaybackScheduler::new(sequence, channel, clock.clone());
                match scheduler.start(start_at_ms) {
                    Ok(offset) => {
                        period = Duration::from_millis(scheduler.sample_size_ms() as u64);
                        transport.start(start_at_ms);
                        next_tick = Instant::now();
                        session = Some(scheduler);
                        let _ = evt_tx.try_send(PlaybackEvent::Started { offset });
                    }
                    Err(e) => {
                        let _ = evt_tx.try_send(PlaybackEvent::Failed(e.to_string()));
                    }
                }
            }
            Some(PlaybackCommand::Stop) => {
                if let Some(mut scheduler) = session.take() {
                    scheduler.stop();
                    transport.stop();
                    let _ = evt_tx.try_send(PlaybackEvent::Stopped);
                }
            }
            Some(PlaybackCommand::Shutdown) => {
                if session.take().is_some() {
                    transport.stop();
                }
                break;
            }
            None => {}
        }

        let outcome = match session.as_mut() {
            Some(scheduler) if Instant::now() >= next_tick => {
                next_tick += period;
                Some(scheduler.tick(&writer))
            }
            _ => None,
        };

        match outcome {
            Some(Ok(TickOutcome::Sent {
                correction: Some(correction),
                ..
            })) => {
                let _ = evt_tx.try_send(PlaybackEvent::Corrected(correction));
            }
            Some(Ok(TickOutcome::Finished)) => {
                session = None;
                transport.stop();
                let _ = evt_tx.try_send(PlaybackEvent::Finished);
            }
            Some(Err(e)) => {
                session = None;
                transport.stop();
                let _ = evt_tx.try_send(PlaybackEvent::Failed(e.to_string()));
            }
            Some(Ok(_)) | None => {}
        }
    }
}
