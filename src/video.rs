//! Video Capture
//!
//! While a capture is active, every live [`Scene::render`](crate::scene::Scene::render)
//! grabs the viewer's image and appends it to a [`VideoEncoder`]. Encoding
//! itself is delegated to the `image` crate: animated GIF or a numbered PNG
//! sequence for external muxing.

use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SceneError};

pub trait VideoEncoder {
    fn append(&mut self, frame: &RgbaImage) -> Result<()>;

    /// Finalizes the output. Appending after closing is an error.
    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    #[default]
    Gif,
    /// `frame_00000.png`, `frame_00001.png`, ... in a directory.
    PngSequence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    /// Output file (or directory for PNG sequences).
    pub path: Option<PathBuf>,
    /// Where to put a timestamp-named output when `path` is not set.
    /// Defaults to the system temp directory.
    pub directory: Option<PathBuf>,
    pub fps: u32,
    pub format: VideoFormat,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            path: None,
            directory: None,
            fps: 30,
            format: VideoFormat::Gif,
        }
    }
}

impl VideoOptions {
    /// Output location: `path`, or `<directory>/<unix seconds>[.gif]`.
    #[must_use]
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        let directory = self.directory.clone().unwrap_or_else(std::env::temp_dir);
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        match self.format {
            VideoFormat::Gif => directory.join(format!("{stamp}.gif")),
            VideoFormat::PngSequence => directory.join(stamp.to_string()),
        }
    }

    /// Opens the encoder for these options.
    pub fn open(&self) -> Result<(PathBuf, Box<dyn VideoEncoder>)> {
        let path = self.resolve_path();
        let encoder: Box<dyn VideoEncoder> = match self.format {
            VideoFormat::Gif => Box::new(GifWriter::create(&path, self.fps)?),
            VideoFormat::PngSequence => Box::new(FrameSequenceWriter::create(&path)?),
        };
        Ok((path, encoder))
    }
}

// ============================================================================
// GIF
// ============================================================================

pub struct GifWriter {
    encoder: Option<GifEncoder<SharedFile>>,
    output: SharedFile,
    delay: Delay,
    frames: usize,
}

impl GifWriter {
    pub fn create(path: &Path, fps: u32) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let output = SharedFile::new(File::create(path)?);
        let mut encoder = GifEncoder::new(output.clone());
        encoder.set_repeat(Repeat::Infinite)?;
        Ok(Self {
            encoder: Some(encoder),
            output,
            delay: Delay::from_numer_denom_ms(1000, fps.max(1)),
            frames: 0,
        })
    }

    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl VideoEncoder for GifWriter {
    fn append(&mut self, frame: &RgbaImage) -> Result<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| SceneError::Image("GIF writer is closed".to_string()))?;
        encoder.encode_frame(Frame::from_parts(frame.clone(), 0, 0, self.delay))?;
        self.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the encoder writes the GIF trailer into the shared buffer.
        if let Some(encoder) = self.encoder.take() {
            drop(encoder);
            self.output.finish()?;
            log::debug!("GIF closed after {} frames", self.frames);
        }
        Ok(())
    }
}

/// Buffered file shared between the GIF encoder and its owner, remembering
/// whether any write failed.
#[derive(Clone)]
struct SharedFile {
    file: Rc<RefCell<BufWriter<File>>>,
    failed: Rc<Cell<bool>>,
}

impl SharedFile {
    fn new(file: File) -> Self {
        Self {
            file: Rc::new(RefCell::new(BufWriter::new(file))),
            failed: Rc::new(Cell::new(false)),
        }
    }

    fn finish(&self) -> io::Result<()> {
        self.file.borrow_mut().flush()?;
        if self.failed.get() {
            return Err(io::Error::other("GIF data could not be written completely"));
        }
        Ok(())
    }

    fn track<T>(&self, result: io::Result<T>) -> io::Result<T> {
        if result.is_err() {
            self.failed.set(true);
        }
        result
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.file.borrow_mut().write(buf);
        self.track(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.file.borrow_mut().flush();
        self.track(result)
    }
}

// ============================================================================
// PNG sequence
// ============================================================================

#[derive(Debug)]
pub struct FrameSequenceWriter {
    directory: PathBuf,
    frames: usize,
    closed: bool,
}

impl FrameSequenceWriter {
    pub fn create(directory: &Path) -> Result<Self> {
        fs::create_dir_all(directory)?;
        Ok(Self {
            directory: directory.to_path_buf(),
            frames: 0,
            closed: false,
        })
    }

    #[must_use]
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("frame_{index:05}.png"))
    }
}

impl VideoEncoder for FrameSequenceWriter {
    fn append(&mut self, frame: &RgbaImage) -> Result<()> {
        if self.closed {
            return Err(SceneError::Image("frame sequence is closed".to_string()));
        }
        frame.save_with_format(self.frame_path(self.frames), ImageFormat::Png)?;
        self.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            log::debug!("{} frames written to {}", self.frames, self.directory.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_is_timestamped_gif() {
        let options = VideoOptions {
            directory: Some(PathBuf::from("/videos")),
            ..Default::default()
        };
        let path = options.resolve_path();
        assert_eq!(path.parent(), Some(Path::new("/videos")));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("gif"));
    }

    #[test]
    fn test_close_writes_trailer() {
        let path = std::env::temp_dir().join(format!("robomeshcat-{}.gif", uuid::Uuid::new_v4()));
        let mut writer = GifWriter::create(&path, 10).unwrap();
        writer.append(&RgbaImage::new(2, 2)).unwrap();
        writer.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        assert_eq!(bytes.last(), Some(&0x3B));
        assert!(writer.append(&RgbaImage::new(2, 2)).is_err());
        fs::remove_file(&path).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_close_reports_failed_flush() {
        let device = Path::new("/dev/full");
        if !device.exists() {
            return;
        }
        let mut writer = GifWriter::create(device, 10).unwrap();
        let appended = writer.append(&RgbaImage::new(2, 2));
        let closed = writer.close();
        assert!(appended.is_err() || matches!(closed, Err(SceneError::Io(_))));
    }

    #[test]
    fn test_explicit_path_wins() {
        let options = VideoOptions {
            path: Some(PathBuf::from("out.gif")),
            directory: Some(PathBuf::from("/ignored")),
            ..Default::default()
        };
        assert_eq!(options.resolve_path(), PathBuf::from("out.gif"));
    }
}
