use super::upload::{path_is_valid, stream_to_file};
use crate::application::service::VideoService;
use crate::domain::records::{ProcessingDetails, RecordStatus};
use crate::error::ServiceError;
use crate::ports::repository::VideoRecordRepository;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

type ApiResult = Result<Json<Value>, ServiceError>;

fn envelope(message: &str, data: impl Serialize) -> Json<Value> {
    Json(json!({ "success": true, "message": message, "data": data }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    id: String,
    video_name: String,
    upload_date: String,
    person_count: u32,
    status: RecordStatus,
    processed_video: String,
    details: ProcessingDetails,
}

/// Accepts the first multipart field carrying a file name.
pub async fn upload_video<R>(
    State(service): State<VideoService<R>>,
    mut multipart: Multipart,
) -> ApiResult
where
    R: VideoRecordRepository + 'static,
{
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::Validation(e.body_text()))?
    {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_owned);

        let (video_name, path) = service.accept_upload(Some(&file_name), content_type.as_deref())?;
        if !path_is_valid(&path) {
            return Err(ServiceError::Validation("Invalid path".to_owned()));
        }

        let size = stream_to_file(&path, field)
            .await
            .map_err(|e| ServiceError::Internal(format!("cannot save upload: {}", e)))?;
        info!(path = %path.display(), bytes = size, "upload saved");

        let frame_stride = service.frame_stride();
        let handle = service
            .submit_upload(video_name, path, frame_stride)
            .await?;

        return Ok(envelope(
            "Video accepted for processing",
            json!({
                "job_id": handle.job_id,
                "status": RecordStatus::Processing,
                "frame_stride": frame_stride,
            }),
        ));
    }

    Err(ServiceError::Validation("No video file provided.".to_owned()))
}

pub async fn get_job<R>(
    State(service): State<VideoService<R>>,
    Path(job_id): Path<String>,
) -> ApiResult
where
    R: VideoRecordRepository + 'static,
{
    let job = service.get_job(&job_id).await?;
    Ok(envelope("Job status fetched successfully", job))
}

pub async fn get_video<R>(
    State(service): State<VideoService<R>>,
    Path(video_id): Path<String>,
) -> ApiResult
where
    R: VideoRecordRepository + 'static,
{
    let record = service.get_record(&video_id).await?;
    let processed_video = service.files().resolve_processed_video(&record);
    let upload_date = record.upload_date();
    Ok(envelope(
        "Video details fetched successfully",
        VideoDetails {
            id: record.id,
            video_name: record.video_name,
            upload_date,
            person_count: record.person_count,
            status: record.status,
            processed_video,
            details: record.details,
        },
    ))
}

pub async fn delete_video<R>(
    State(service): State<VideoService<R>>,
    Path(video_id): Path<String>,
) -> Result<Json<Value>, ServiceError>
where
    R: VideoRecordRepository + 'static,
{
    service.delete_record(&video_id).await?;
    Ok(Json(json!({ "success": true, "message": "Video deleted permanently" })))
}

pub async fn get_analytics<R>(State(service): State<VideoService<R>>) -> ApiResult
where
    R: VideoRecordRepository + 'static,
{
    let summary = service.analytics().await?;
    Ok(envelope("Analytics fetched successfully", summary))
}

pub async fn download_report<R>(
    State(service): State<VideoService<R>>,
) -> Result<impl IntoResponse, ServiceError>
where
    R: VideoRecordRepository + 'static,
{
    let csv = service.analytics().await?.to_csv();
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"analytics_report.csv\"",
            ),
        ],
        csv,
    ))
}
