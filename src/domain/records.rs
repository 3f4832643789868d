use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current UTC wall-clock time, the timestamp flavour persisted in records.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Processing,
    Completed,
    Failed,
}

impl RecordStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RecordStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Processing => "processing",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
        }
    }
}

/// Average person count over one second of source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondCount {
    pub second: u64,
    pub count: u32,
}

/// Per-run processing summary. A failed run only carries `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampled_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_stride: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counts_per_second: Vec<SecondCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingDetails {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Durable record of one uploaded video. The id is shared with the job that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub video_name: String,
    #[serde(default)]
    pub person_count: u32,
    pub status: RecordStatus,
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub input_path: String,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub details: ProcessingDetails,
}

impl VideoRecord {
    pub fn processing(
        id: impl Into<String>,
        video_name: impl Into<String>,
        input_path: &Path,
    ) -> Self {
        Self {
            id: id.into(),
            video_name: video_name.into(),
            person_count: 0,
            status: RecordStatus::Processing,
            created_at: now(),
            completed_at: None,
            input_path: input_path.to_string_lossy().into_owned(),
            output_path: String::new(),
            details: ProcessingDetails::default(),
        }
    }

    pub fn complete(&mut self, peak: u32, output_path: &Path, details: ProcessingDetails) {
        self.status = RecordStatus::Completed;
        self.person_count = peak;
        self.output_path = output_path.to_string_lossy().into_owned();
        self.details = details;
        self.completed_at = Some(now());
    }

    pub fn fail(&mut self, message: &str) {
        self.status = RecordStatus::Failed;
        self.person_count = 0;
        self.details = ProcessingDetails::failure(message);
        self.completed_at = Some(now());
    }

    pub fn error(&self) -> Option<&str> {
        self.details.error.as_deref()
    }

    /// Date part of `created_at`, as shown in upload listings.
    pub fn upload_date(&self) -> String {
        self.created_at.date().to_string()
    }

    pub fn processing_time_seconds(&self) -> f64 {
        self.details.duration_seconds.unwrap_or(0.0)
    }
}
