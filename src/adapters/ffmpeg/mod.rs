//! Video I/O through ffmpeg: libav decode/encode plus the CLI for the final transcode.

mod decode;
mod encode;
mod transcode;

pub use decode::FfmpegSource;
pub use encode::FfmpegSink;
pub use transcode::FfmpegCliTranscoder;

use crate::error::VideoError;
use crate::ports::video::{FrameSink, FrameSource, VideoBackend};
use ffmpeg_next as ffmpeg;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    /// Initializes libav once for the process.
    pub fn new() -> Result<Self, VideoError> {
        ffmpeg::init().map_err(|e| VideoError::Decode(format!("ffmpeg init failed: {}", e)))?;
        ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
        Ok(Self)
    }
}

impl VideoBackend for FfmpegBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, VideoError> {
        Ok(Box::new(FfmpegSource::open(path)?))
    }

    fn create_sink(
        &self,
        path: &Path,
        fps: f64,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn FrameSink>, VideoError> {
        Ok(Box::new(FfmpegSink::create(path, fps, width, height)?))
    }
}
