use super::records::{RecordStatus, VideoRecord};
use chrono::{Duration, NaiveDateTime, Timelike};
use serde::Serialize;

const HOURLY_WINDOW: i64 = 12;
const RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyBucket {
    pub hour: String,
    pub detections: u64,
    pub uploads: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoCount {
    pub video: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentUpload {
    pub id: String,
    pub video_name: String,
    pub upload_date: String,
    pub person_count: u32,
    pub status: RecordStatus,
    pub processed_video: String,
    pub processing_time_seconds: f64,
}

impl RecentUpload {
    pub fn from_record(record: &VideoRecord, processed_video: String) -> Self {
        Self {
            id: record.id.clone(),
            video_name: record.video_name.clone(),
            upload_date: record.upload_date(),
            person_count: record.person_count,
            status: record.status,
            processed_video,
            processing_time_seconds: record.processing_time_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_videos: usize,
    pub total_persons: u64,
    pub total_processing_time_seconds: f64,
    pub active_cameras: u32,
    pub todays_detections: u64,
    pub hourly_analytics: Vec<HourlyBucket>,
    pub person_count_per_video: Vec<VideoCount>,
    pub recent_uploads: Vec<RecentUpload>,
}

impl AnalyticsSummary {
    /// Aggregates over completed records; `recent_uploads` covers every status, newest first.
    pub fn build<F>(records: &[VideoRecord], now: NaiveDateTime, processed_video: F) -> Self
    where
        F: Fn(&VideoRecord) -> String,
    {
        let completed: Vec<&VideoRecord> = records
            .iter()
            .filter(|r| r.status == RecordStatus::Completed)
            .collect();

        let total_persons = completed.iter().map(|r| u64::from(r.person_count)).sum();
        let total_processing_time_seconds =
            completed.iter().map(|r| r.processing_time_seconds()).sum();

        let today = now.date();
        let todays_detections = completed
            .iter()
            .filter(|r| r.created_at.date() == today)
            .map(|r| u64::from(r.person_count))
            .sum();

        let current_hour = now
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        let hourly_analytics = (0..HOURLY_WINDOW)
            .rev()
            .map(|hours_ago| {
                let start = current_hour - Duration::hours(hours_ago);
                let end = start + Duration::hours(1);
                let in_hour: Vec<&&VideoRecord> = completed
                    .iter()
                    .filter(|r| start <= r.created_at && r.created_at < end)
                    .collect();
                HourlyBucket {
                    hour: start.format("%H:00").to_string(),
                    detections: in_hour.iter().map(|r| u64::from(r.person_count)).sum(),
                    uploads: in_hour.len() as u64,
                }
            })
            .collect();

        let person_count_per_video = completed
            .iter()
            .skip(completed.len().saturating_sub(RECENT_LIMIT))
            .map(|r| VideoCount {
                video: r.video_name.clone(),
                count: r.person_count,
            })
            .collect();

        let recent_uploads = records
            .iter()
            .skip(records.len().saturating_sub(RECENT_LIMIT))
            .rev()
            .map(|r| RecentUpload::from_record(r, processed_video(r)))
            .collect();

        Self {
            total_videos: completed.len(),
            total_persons,
            total_processing_time_seconds,
            active_cameras: u32::from(!completed.is_empty()),
            todays_detections,
            hourly_analytics,
            person_count_per_video,
            recent_uploads,
        }
    }

    /// CSV export of the recent uploads.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("video_name,upload_date,person_count,status\n");
        for upload in &self.recent_uploads {
            csv.push_str(&format!(
                "{},{},{},{}\n",
                upload.video_name,
                upload.upload_date,
                upload.person_count,
                upload.status.as_str()
            ));
        }
        csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::ProcessingDetails;
    use chrono::NaiveDate;
    use std::path::Path;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap()
    }

    fn record(
        id: &str,
        status: RecordStatus,
        persons: u32,
        created_at: NaiveDateTime,
    ) -> VideoRecord {
        let mut record = VideoRecord::processing(id, format!("{id}.mp4"), Path::new("in.mp4"));
        record.created_at = created_at;
        match status {
            RecordStatus::Completed => record.complete(
                persons,
                Path::new("out.mp4"),
                ProcessingDetails {
                    duration_seconds: Some(1.5),
                    ..ProcessingDetails::default()
                },
            ),
            RecordStatus::Failed => record.fail("boom"),
            RecordStatus::Processing => {}
        }
        record
    }

    #[test]
    fn test_totals_cover_completed_records_only() {
        let now = at(10, 15, 30);
        let records = vec![
            record("a", RecordStatus::Completed, 3, at(10, 15, 5)),
            record("b", RecordStatus::Failed, 0, at(10, 14, 0)),
            record("c", RecordStatus::Completed, 4, at(9, 10, 0)),
            record("d", RecordStatus::Processing, 0, at(10, 15, 20)),
        ];

        let summary = AnalyticsSummary::build(&records, now, |_| String::new());

        assert_eq!(summary.total_videos, 2);
        assert_eq!(summary.total_persons, 7);
        assert_eq!(summary.total_processing_time_seconds, 3.0);
        assert_eq!(summary.active_cameras, 1);
        assert_eq!(summary.todays_detections, 3);
        assert_eq!(summary.recent_uploads.len(), 4);
        assert_eq!(summary.recent_uploads[0].id, "d");
    }

    #[test]
    fn test_hourly_window_ends_at_current_hour() {
        let now = at(10, 15, 30);
        let records = vec![
            record("a", RecordStatus::Completed, 3, at(10, 15, 5)),
            record("b", RecordStatus::Completed, 2, at(10, 4, 59)),
            record("c", RecordStatus::Completed, 9, at(10, 3, 59)),
        ];

        let summary = AnalyticsSummary::build(&records, now, |_| String::new());
        let hours = &summary.hourly_analytics;

        assert_eq!(hours.len(), 12);
        assert_eq!(hours[0].hour, "04:00");
        assert_eq!(hours[0].uploads, 1);
        assert_eq!(hours[0].detections, 2);
        assert_eq!(hours[11].hour, "15:00");
        assert_eq!(hours[11].detections, 3);
        assert_eq!(hours.iter().map(|h| h.uploads).sum::<u64>(), 2);
    }

    #[test]
    fn test_recent_lists_are_capped() {
        let now = at(10, 12, 0);
        let records: Vec<VideoRecord> = (0..15)
            .map(|i| record(&format!("v{i}"), RecordStatus::Completed, i, at(10, 11, i)))
            .collect();

        let summary = AnalyticsSummary::build(&records, now, |r| format!("/outputs/{}", r.id));

        assert_eq!(summary.person_count_per_video.len(), 10);
        assert_eq!(summary.person_count_per_video[0].video, "v5.mp4");
        assert_eq!(summary.recent_uploads.len(), 10);
        assert_eq!(summary.recent_uploads[0].id, "v14");
        assert_eq!(summary.recent_uploads[0].processed_video, "/outputs/v14");
    }

    #[test]
    fn test_empty_summary_has_no_active_camera() {
        let summary = AnalyticsSummary::build(&[], at(1, 0, 0), |_| String::new());
        assert_eq!(summary.active_cameras, 0);
        assert_eq!(summary.hourly_analytics.len(), 12);
        assert!(summary.recent_uploads.is_empty());
    }

    #[test]
    fn test_csv_report() {
        let records = vec![record("a", RecordStatus::Completed, 3, at(10, 9, 0))];
        let csv = AnalyticsSummary::build(&records, at(10, 10, 0), |_| String::new()).to_csv();

        assert_eq!(
            csv,
            "video_name,upload_date,person_count,status\na.mp4,2026-03-10,3,completed\n"
        );
    }

    #[test]
    fn test_recent_upload_serializes_camel_case() {
        let records = vec![record("a", RecordStatus::Failed, 0, at(10, 9, 0))];
        let summary = AnalyticsSummary::build(&records, at(10, 10, 0), |_| String::new());
        let value = serde_json::to_value(&summary.recent_uploads[0]).unwrap();

        assert_eq!(value["videoName"], "a.mp4");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["processingTimeSeconds"], 0.0);
    }
}
