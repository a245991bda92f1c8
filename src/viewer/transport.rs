//! Viewer Transports
//!
//! A [`Transport`] delivers [`Command`]s to the external viewer and fetches
//! its rendered image. Two implementations ship with the crate:
//!
//! - [`MemoryTransport`]: keeps every command in a shared [`CommandLog`] and
//!   answers image requests with a fixed raster. Used by tests and for
//!   offline recording.
//! - [`StreamTransport`]: newline-delimited JSON over any writer/reader pair
//!   (a child process' pipes, a socket, stdout).

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use serde::Serialize;

use crate::errors::{Result, SceneError};
use crate::viewer::command::Command;

pub trait Transport {
    fn send(&mut self, command: Command) -> Result<()>;

    /// The viewer's current raster image.
    fn capture_image(&mut self) -> Result<RgbaImage>;

    /// Blocks until the viewer accepts commands.
    fn wait_until_ready(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// In-memory transport
// ============================================================================

/// Shared handle to the commands received by a [`MemoryTransport`].
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Rc<RefCell<Vec<Command>>>,
}

impl CommandLog {
    /// Snapshot of all commands received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.commands.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<Command> {
        self.commands.borrow().last().cloned()
    }

    /// Drains the log.
    pub fn take(&self) -> Vec<Command> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }

    fn push(&self, command: Command) {
        self.commands.borrow_mut().push(command);
    }
}

#[derive(Debug)]
pub struct MemoryTransport {
    log: CommandLog,
    image: RgbaImage,
}

impl MemoryTransport {
    /// A transport answering image requests with a 64x48 opaque white image.
    #[must_use]
    pub fn new() -> Self {
        Self::with_image(RgbaImage::from_pixel(64, 48, image::Rgba([255, 255, 255, 255])))
    }

    #[must_use]
    pub fn with_image(image: RgbaImage) -> Self {
        Self {
            log: CommandLog::default(),
            image,
        }
    }

    #[must_use]
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    pub fn set_image(&mut self, image: RgbaImage) {
        self.image = image;
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, command: Command) -> Result<()> {
        self.log.push(command);
        Ok(())
    }

    fn capture_image(&mut self) -> Result<RgbaImage> {
        Ok(self.image.clone())
    }
}

// ============================================================================
// Stream transport
// ============================================================================

/// Requests that expect a one-line reply.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Request {
    CaptureImage,
    Wait,
}

/// Line-based JSON transport.
///
/// Every command is written as one JSON object per line. `capture_image`
/// writes a `{"type":"capture_image"}` request and expects a PNG data URI
/// (`data:image/png;base64,...`) on the next reply line; `wait_until_ready`
/// writes `{"type":"wait"}` and expects any reply line.
pub struct StreamTransport<W, R> {
    writer: W,
    reader: R,
}

impl<W: Write, R: BufRead> StreamTransport<W, R> {
    pub fn new(writer: W, reader: R) -> Self {
        Self { writer, reader }
    }

    pub fn into_inner(self) -> (W, R) {
        (self.writer, self.reader)
    }

    fn write_line<T: Serialize>(&mut self, message: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(SceneError::Transport("viewer closed the connection".to_string()));
        }
        Ok(line.trim_end().to_string())
    }
}

impl<W: Write, R: BufRead> Transport for StreamTransport<W, R> {
    fn send(&mut self, command: Command) -> Result<()> {
        log::trace!("-> {} {:?}", command.kind(), command.path());
        self.write_line(&command)
    }

    fn capture_image(&mut self) -> Result<RgbaImage> {
        self.write_line(&Request::CaptureImage)?;
        let reply = self.read_line()?;
        decode_data_uri(&reply)
    }

    fn wait_until_ready(&mut self) -> Result<()> {
        self.write_line(&Request::Wait)?;
        let reply = self.read_line()?;
        log::debug!("Viewer ready: {reply}");
        Ok(())
    }
}

/// Decodes a base64 image data URI into an RGBA raster.
pub fn decode_data_uri(uri: &str) -> Result<RgbaImage> {
    let payload = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, data)| data)
        .ok_or_else(|| SceneError::Transport(format!("expected a base64 data URI, got '{}'", truncate(uri))))?;
    let bytes = STANDARD.decode(payload)?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(32) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
