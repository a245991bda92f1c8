//! Viewer Link
//!
//! Every item attached to a [`Scene`](crate::scene::Scene) holds a clone of
//! the scene's [`ViewerHandle`]. The shared [`Viewer`] owns the transport and
//! an explicit [`Mode`]: property writes either go straight to the transport
//! ([`Mode::Live`]) or into the open animation frame ([`Mode::Recording`]).
//! Switching the mode on the shared viewer rebinds every item at once.

pub mod command;
pub mod transport;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::Mat4;
use image::RgbaImage;

use crate::animation::{Animation, PropertyValue, Recorder};
use crate::errors::{Result, SceneError};
use command::ANIMATION_PATH;

pub use command::{AnimationOptions, Command};
pub use transport::{CommandLog, MemoryTransport, StreamTransport, Transport};

/// Shared, single-threaded link to the viewer.
pub type ViewerHandle = Rc<RefCell<Viewer>>;

pub enum Mode {
    Live,
    Recording(Recorder),
}

pub struct Viewer {
    transport: Box<dyn Transport>,
    mode: Mode,
}

impl Viewer {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            mode: Mode::Live,
        }
    }

    #[must_use]
    pub fn into_handle(self) -> ViewerHandle {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self.mode, Mode::Recording(_))
    }

    #[must_use]
    pub fn recorder(&self) -> Option<&Recorder> {
        match &self.mode {
            Mode::Recording(recorder) => Some(recorder),
            Mode::Live => None,
        }
    }

    pub(crate) fn recorder_mut(&mut self) -> Option<&mut Recorder> {
        match &mut self.mode {
            Mode::Recording(recorder) => Some(recorder),
            Mode::Live => None,
        }
    }

    /// Destination of property writes in the current mode.
    pub(crate) fn sink(&mut self) -> Sink<'_> {
        match &mut self.mode {
            Mode::Live => Sink::Live(self.transport.as_mut()),
            Mode::Recording(recorder) => Sink::Recording(recorder),
        }
    }

    /// Sends a command to the transport regardless of mode.
    pub fn send(&mut self, command: Command) -> Result<()> {
        log::trace!("{} {}", command.kind(), command.path().unwrap_or(ANIMATION_PATH));
        self.transport.send(command)
    }

    pub fn capture_image(&mut self) -> Result<RgbaImage> {
        self.transport.capture_image()
    }

    pub fn wait_until_ready(&mut self) -> Result<()> {
        self.transport.wait_until_ready()
    }

    pub(crate) fn begin_recording(&mut self, fps: u32) -> Result<()> {
        if self.is_recording() {
            return Err(SceneError::AlreadyRecording);
        }
        self.mode = Mode::Recording(Recorder::new(fps));
        Ok(())
    }

    /// Switches back to live mode, handing out the session.
    pub(crate) fn end_recording(&mut self) -> Result<Recorder> {
        match std::mem::replace(&mut self.mode, Mode::Live) {
            Mode::Recording(recorder) => Ok(recorder),
            Mode::Live => Err(SceneError::NotRecording),
        }
    }

    pub(crate) fn publish(&mut self, animation: Animation) -> Result<()> {
        self.send(Command::SetAnimation {
            animations: animation,
            options: AnimationOptions::default(),
        })
    }
}

impl fmt::Debug for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &self.mode {
            Mode::Live => "live".to_string(),
            Mode::Recording(r) => format!("recording frame {}", r.current_frame().index()),
        };
        f.debug_struct("Viewer").field("mode", &mode).finish_non_exhaustive()
    }
}

/// Mode-resolved destination of a property write.
pub(crate) enum Sink<'a> {
    Live(&'a mut dyn Transport),
    Recording(&'a mut Recorder),
}

impl Sink<'_> {
    pub fn set_transform(&mut self, path: &str, matrix: &Mat4) -> Result<()> {
        match self {
            Sink::Live(transport) => transport.send(Command::SetTransform {
                path: path.to_string(),
                matrix: matrix.to_cols_array(),
            }),
            Sink::Recording(recorder) => {
                recorder.set_transform(path, matrix);
                Ok(())
            }
        }
    }

    pub fn set_property(&mut self, path: &str, property: &str, value: PropertyValue) -> Result<()> {
        match self {
            Sink::Live(transport) => transport.send(Command::SetProperty {
                path: path.to_string(),
                property: property.to_string(),
                value,
            }),
            Sink::Recording(recorder) => {
                recorder.set_property(path, property, value);
                Ok(())
            }
        }
    }
}
