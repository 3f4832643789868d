use crate::error::TranscodeError;
use crate::ports::video::Transcoder;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Longest stderr excerpt kept in a transcode error.
const STDERR_TAIL: usize = 2000;

/// Re-encodes the intermediate file to H.264 with the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegCliTranscoder {
    program: String,
}

impl FfmpegCliTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegCliTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Transcoder for FfmpegCliTranscoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        debug!(input = %input.display(), output = %output.display(), "transcoding to h264");

        let result = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-c:v")
            .arg("libx264")
            .arg("-preset")
            .arg("veryfast")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-movflags")
            .arg("+faststart")
            .arg(output)
            .output()?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let start = stderr
                .char_indices()
                .rev()
                .nth(STDERR_TAIL)
                .map(|(i, _)| i)
                .unwrap_or(0);
            return Err(TranscodeError::Failed {
                status: result.status.to_string(),
                stderr: stderr[start..].trim().to_string(),
            });
        }
        Ok(())
    }
}
