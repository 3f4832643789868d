//! Error taxonomy shared by the pipeline, the stores and the service layer.

use std::path::PathBuf;
use thiserror::Error;

/// Message stored for failures whose detail must not reach end users.
pub const GENERIC_FAILURE_MESSAGE: &str = "Video processing failed.";

/// Failure of the frame decode/encode capability.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("cannot open video {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("cannot load detection model {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("cannot run transcoder: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("transcoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Coarse failure class used to pick the message stored on a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Input,
    Writer,
    Encode,
    Internal,
}

/// Terminal failure of one pipeline run. Nothing is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame_stride must be >= 1.")]
    InvalidStride,
    #[error("Could not open input video: {}", path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: VideoError,
    },
    #[error("Invalid video dimensions.")]
    InvalidDimensions,
    #[error("Could not initialize output video writer.")]
    Writer(#[source] VideoError),
    #[error("Failed to encode output video for browser playback.")]
    Encode(#[source] TranscodeError),
    #[error("frame decode failed")]
    Decode(#[source] VideoError),
    #[error("frame write failed")]
    Write(#[source] VideoError),
    #[error("person detection failed")]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::InvalidStride => FailureKind::Validation,
            PipelineError::OpenInput { .. } | PipelineError::InvalidDimensions => {
                FailureKind::Input
            }
            PipelineError::Writer(_) => FailureKind::Writer,
            PipelineError::Encode(_) => FailureKind::Encode,
            PipelineError::Decode(_)
            | PipelineError::Write(_)
            | PipelineError::Detection(_)
            | PipelineError::Io(_) => FailureKind::Internal,
        }
    }

    /// Message safe to persist on the failed record and job.
    pub fn public_message(&self) -> String {
        match self.kind() {
            FailureKind::Validation
            | FailureKind::Input
            | FailureKind::Writer
            | FailureKind::Encode => self.to_string(),
            FailureKind::Internal => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced synchronously to callers of the service boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}
