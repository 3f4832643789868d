use crate::domain::detection::Detection;
use crate::error::DetectionError;
use image::RgbImage;

/// Object detection over one decoded frame.
///
/// One detector is shared by every running job, so implementations must accept
/// concurrent calls (serializing internally if the backend cannot).
#[cfg_attr(test, mockall::automock)]
pub trait Detector: Send + Sync {
    /// All detections of the frame, any class, boxes in frame pixel coordinates.
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, DetectionError>;
}
