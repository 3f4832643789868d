use super::records::{now, RecordStatus, VideoRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Volatile progress view of one processing job, keyed by job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub status: RecordStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_stride: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_person_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_video: Option<String>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl JobState {
    fn empty(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            record_id: None,
            status: RecordStatus::Processing,
            progress: 0,
            video_name: None,
            frame_stride: None,
            processed_frames: None,
            total_frames: None,
            total_person_count: None,
            processed_video: None,
            error: None,
            started_at: None,
            completed_at: None,
            updated_at: now(),
        }
    }

    /// Creates a state from a first update, as the registry does for unknown ids.
    pub fn from_update(job_id: &str, update: JobUpdate) -> Self {
        let mut state = Self::empty(job_id);
        state.apply(update);
        state
    }

    /// Merges every field present in `update` and stamps `updated_at`.
    pub fn apply(&mut self, update: JobUpdate) {
        let JobUpdate {
            record_id,
            status,
            progress,
            video_name,
            frame_stride,
            processed_frames,
            total_frames,
            total_person_count,
            processed_video,
            error,
            started_at,
            completed_at,
        } = update;

        if let Some(v) = record_id {
            self.record_id = Some(v);
        }
        if let Some(v) = status {
            self.status = v;
        }
        if let Some(v) = progress {
            self.progress = v.min(100);
        }
        if let Some(v) = video_name {
            self.video_name = Some(v);
        }
        if let Some(v) = frame_stride {
            self.frame_stride = Some(v);
        }
        if let Some(v) = processed_frames {
            self.processed_frames = Some(v);
        }
        if let Some(v) = total_frames {
            self.total_frames = Some(v);
        }
        if let Some(v) = total_person_count {
            self.total_person_count = Some(v);
        }
        if let Some(v) = processed_video {
            self.processed_video = Some(v);
        }
        if let Some(v) = error {
            self.error = Some(v);
        }
        if let Some(v) = started_at {
            self.started_at = Some(v);
        }
        if let Some(v) = completed_at {
            self.completed_at = Some(v);
        }
        self.updated_at = now();
    }

    /// Degraded view rebuilt from the durable record once the live state is gone,
    /// e.g. after a restart. Fine-grained progress cannot be recovered.
    pub fn from_record(record: &VideoRecord, processed_video: String) -> Self {
        let mut state = Self::empty(&record.id);
        state.record_id = Some(record.id.clone());
        state.video_name = Some(record.video_name.clone());
        state.status = record.status;
        state.progress = if record.status == RecordStatus::Completed {
            100
        } else {
            0
        };
        state.total_person_count = Some(record.person_count);
        state.processed_video = Some(processed_video);
        state.error = match record.status {
            RecordStatus::Failed => record.error().map(str::to_string),
            _ => None,
        };
        state.completed_at = record.completed_at;
        state
    }
}

/// Partial update of a [`JobState`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub record_id: Option<String>,
    pub status: Option<RecordStatus>,
    pub progress: Option<u8>,
    pub video_name: Option<String>,
    pub frame_stride: Option<u32>,
    pub processed_frames: Option<u64>,
    pub total_frames: Option<u64>,
    pub total_person_count: Option<u32>,
    pub processed_video: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

impl JobUpdate {
    pub fn progress(progress: u8, processed_frames: u64, total_frames: u64) -> Self {
        Self {
            status: Some(RecordStatus::Processing),
            progress: Some(progress),
            processed_frames: Some(processed_frames),
            total_frames: Some(total_frames),
            ..Self::default()
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            status: Some(RecordStatus::Failed),
            error: Some(message.to_string()),
            completed_at: Some(now()),
            ..Self::default()
        }
    }
}
