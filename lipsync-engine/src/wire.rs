//! Servo controller wire commands
//!
//! ASCII, one command per servo move, no response awaited:
//!
//! ```text
//! #<channel>P<pulseWidth>\r
//! ```

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Move one servo to a pulse width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCommand {
    pub channel: i32,
    pub pulse_width: i32,
}

impl ServoCommand {
    pub fn new(channel: i32, pulse_width: i32) -> Self {
        Self { channel, pulse_width }
    }

    /// UTF-8 bytes as sent on the wire
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Write the whole command in one call
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.encode())?;
        out.flush()
    }
}

impl fmt::Display for ServoCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}P{}\r", self.channel, self.pulse_width)
    }
}

/// Shared handle to the controller's output stream
///
/// The connection is opened and closed by its owner; holders of a clone may
/// only send. Each send holds the lock for exactly one command so writes
/// never interleave.
#[derive(Debug)]
pub struct CommandWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for CommandWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> CommandWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(out)),
        }
    }

    /// Send one command
    pub fn send(&self, command: &ServoCommand) -> io::Result<()> {
        let mut out = self.inner.lock();
        command.write_to(&mut *out)
    }

    /// Direct access to the underlying stream
    pub fn lock(&self) -> MutexGuard<'_, W> {
        self.inner.lock()
    }
}
