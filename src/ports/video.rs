use crate::error::{TranscodeError, VideoError};
use image::RgbImage;
use std::path::Path;

/// Properties reported by a source when it is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    /// Native frame rate; 0 when the container does not say.
    pub fps: f64,
    /// Total frame count; 0 when unknown.
    pub total_frames: u64,
    pub width: u32,
    pub height: u32,
}

/// Sequential frame decoder.
pub trait FrameSource: Send {
    fn info(&self) -> StreamInfo;

    /// Next frame in presentation order, `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, VideoError>;

    /// Consumes one frame without handing it out. Returns false at end of stream.
    fn skip_frame(&mut self) -> Result<bool, VideoError> {
        Ok(self.next_frame()?.is_some())
    }
}

/// Frame encoder writing the intermediate container.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError>;

    /// Flushes pending frames and closes the container.
    fn finish(&mut self) -> Result<(), VideoError>;
}

pub trait VideoBackend: Send + Sync {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, VideoError>;

    fn create_sink(
        &self,
        path: &Path,
        fps: f64,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn FrameSink>, VideoError>;
}

/// Converts the intermediate container into the browser-compatible final one.
#[cfg_attr(test, mockall::automock)]
pub trait Transcoder: Send + Sync {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}
