//! Job driver and the operations exposed to the HTTP layer.

use super::pipeline::{Pipeline, PipelineOutput};
use crate::adapters::local::fs::FsAdapter;
use crate::adapters::local::job_registry::JobRegistry;
use crate::config::AppConfig;
use crate::domain::analytics::AnalyticsSummary;
use crate::domain::jobs::{JobState, JobUpdate};
use crate::domain::progress::Progress;
use crate::domain::records::{now, RecordStatus, VideoRecord};
use crate::domain::uploads::{
    display_name, is_supported_video, unique_input_path, UNSUPPORTED_UPLOAD_MESSAGE,
};
use crate::error::{FailureKind, PipelineError, ServiceError, GENERIC_FAILURE_MESSAGE};
use crate::ports::repository::VideoRecordRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub frame_stride: u32,
    pub max_concurrent_jobs: usize,
}

impl From<&AppConfig> for ServiceSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
            frame_stride: config.frame_stride,
            max_concurrent_jobs: config.max_concurrent_jobs,
        }
    }
}

/// An accepted upload. `task` resolves once the job reaches a terminal state.
#[derive(Debug)]
pub struct JobHandle {
    pub job_id: String,
    pub task: JoinHandle<()>,
}

pub struct VideoService<R> {
    repo: Arc<R>,
    jobs: Arc<JobRegistry>,
    pipeline: Arc<Pipeline>,
    files: FsAdapter,
    workers: Arc<Semaphore>,
    upload_dir: PathBuf,
    frame_stride: u32,
}

impl<R> Clone for VideoService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            jobs: self.jobs.clone(),
            pipeline: self.pipeline.clone(),
            files: self.files.clone(),
            workers: self.workers.clone(),
            upload_dir: self.upload_dir.clone(),
            frame_stride: self.frame_stride,
        }
    }
}

impl<R> VideoService<R>
where
    R: VideoRecordRepository + 'static,
{
    pub fn new(
        repo: Arc<R>,
        jobs: Arc<JobRegistry>,
        pipeline: Arc<Pipeline>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            repo,
            jobs,
            pipeline,
            files: FsAdapter::new(settings.output_dir),
            workers: Arc::new(Semaphore::new(settings.max_concurrent_jobs.max(1))),
            upload_dir: settings.upload_dir,
            frame_stride: settings.frame_stride,
        }
    }

    pub fn frame_stride(&self) -> u32 {
        self.frame_stride
    }

    pub fn files(&self) -> &FsAdapter {
        &self.files
    }

    /// Checks an incoming upload and returns its display name and destination path.
    pub fn accept_upload(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<(String, PathBuf), ServiceError> {
        if !is_supported_video(file_name, content_type) {
            return Err(ServiceError::Validation(UNSUPPORTED_UPLOAD_MESSAGE.to_string()));
        }
        let name = display_name(file_name);
        let path = unique_input_path(&self.upload_dir, &name);
        Ok((name, path))
    }

    /// Registers the upload and queues it for processing.
    ///
    /// The record and the job entry exist before this returns; the pipeline
    /// runs later, once a worker slot is free.
    pub async fn submit_upload(
        &self,
        video_name: String,
        input_path: PathBuf,
        frame_stride: u32,
    ) -> Result<JobHandle, ServiceError> {
        let job_id = Uuid::new_v4().to_string();

        self.repo
            .append(VideoRecord::processing(&job_id, &video_name, &input_path))
            .await?;
        self.jobs.set(
            &job_id,
            JobUpdate {
                record_id: Some(job_id.clone()),
                status: Some(RecordStatus::Processing),
                progress: Some(0),
                video_name: Some(video_name.clone()),
                frame_stride: Some(frame_stride),
                started_at: Some(now()),
                ..JobUpdate::default()
            },
        );
        info!(job_id = %job_id, video = %video_name, "upload accepted");

        let service = self.clone();
        let id = job_id.clone();
        let task = tokio::spawn(async move {
            service.drive(id, input_path, frame_stride).await;
        });

        Ok(JobHandle { job_id, task })
    }

    async fn drive(&self, job_id: String, input_path: PathBuf, frame_stride: u32) {
        let _permit = match self.workers.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "worker pool closed");
                self.finish_failed(&job_id, GENERIC_FAILURE_MESSAGE).await;
                return;
            }
        };

        let pipeline = self.pipeline.clone();
        let jobs = self.jobs.clone();
        let output_dir = self.files.output_dir().to_path_buf();
        let id = job_id.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            // Only submit_upload creates entries; a deleted job stays deleted.
            let mut on_progress = |p: Progress| {
                jobs.update_existing(
                    &id,
                    JobUpdate::progress(p.percent, p.processed_frames, p.total_frames),
                );
            };
            pipeline.run(&input_path, &output_dir, frame_stride, &mut on_progress)
        })
        .await;

        match outcome {
            Ok(Ok(output)) => self.finish_completed(&job_id, output).await,
            Ok(Err(e)) => {
                let message = failure_message(&job_id, &e);
                self.finish_failed(&job_id, &message).await;
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "pipeline task aborted");
                self.finish_failed(&job_id, GENERIC_FAILURE_MESSAGE).await;
            }
        }
    }

    async fn finish_completed(&self, job_id: &str, output: PipelineOutput) {
        let PipelineOutput {
            output_path,
            peak_person_count,
            details,
        } = output;
        let processed_video = FsAdapter::public_ref(&output_path);

        let stored_path = output_path.clone();
        let updated = self
            .repo
            .update(
                job_id,
                Box::new(move |record: &mut VideoRecord| {
                    record.complete(peak_person_count, &stored_path, details)
                }),
            )
            .await;

        match updated {
            Ok(true) => {
                self.jobs.update_existing(
                    job_id,
                    JobUpdate {
                        status: Some(RecordStatus::Completed),
                        progress: Some(100),
                        total_person_count: Some(peak_person_count),
                        processed_video: Some(processed_video),
                        completed_at: Some(now()),
                        ..JobUpdate::default()
                    },
                );
                info!(job_id = %job_id, peak = peak_person_count, "job completed");
            }
            Ok(false) => {
                info!(job_id = %job_id, "record deleted while processing, dropping output");
                remove_file(&output_path).await;
                self.jobs.remove(job_id);
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "cannot store completed record");
                remove_file(&output_path).await;
                self.finish_failed(job_id, GENERIC_FAILURE_MESSAGE).await;
            }
        }
    }

    async fn finish_failed(&self, job_id: &str, message: &str) {
        let stored = message.to_string();
        match self
            .repo
            .update(
                job_id,
                Box::new(move |record: &mut VideoRecord| record.fail(&stored)),
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                self.jobs.remove(job_id);
                return;
            }
            Err(e) => error!(job_id = %job_id, error = %e, "cannot store failed record"),
        }
        self.jobs.update_existing(job_id, JobUpdate::failed(message));
    }

    /// Live job state, or a view rebuilt from the record once the live one is gone.
    pub async fn get_job(&self, job_id: &str) -> Result<JobState, ServiceError> {
        if let Some(state) = self.jobs.get(job_id) {
            return Ok(state);
        }
        match self.repo.get(job_id).await? {
            Some(record) => {
                let processed_video = self.files.resolve_processed_video(&record);
                Ok(JobState::from_record(&record, processed_video))
            }
            None => Err(ServiceError::NotFound("Job not found.".to_string())),
        }
    }

    pub async fn get_record(&self, record_id: &str) -> Result<VideoRecord, ServiceError> {
        self.repo
            .get(record_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Video record not found.".to_string()))
    }

    pub async fn list_records(&self) -> Result<Vec<VideoRecord>, ServiceError> {
        Ok(self.repo.list().await?)
    }

    /// Removes the record, its media files and its job entry.
    pub async fn delete_record(&self, record_id: &str) -> Result<VideoRecord, ServiceError> {
        let record = self
            .repo
            .delete(record_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Video record not found.".to_string()))?;

        for path in [&record.input_path, &record.output_path] {
            remove_file(Path::new(path)).await;
        }
        self.jobs.remove(record_id);

        info!(record_id = %record_id, "record deleted");
        Ok(record)
    }

    pub async fn analytics(&self) -> Result<AnalyticsSummary, ServiceError> {
        let records = self.repo.list().await?;
        Ok(AnalyticsSummary::build(&records, now(), |record| {
            self.files.resolve_processed_video(record)
        }))
    }
}

/// Message stored on a failed job. Internal detail is logged, never stored.
fn failure_message(job_id: &str, err: &PipelineError) -> String {
    match err.kind() {
        FailureKind::Validation
        | FailureKind::Input
        | FailureKind::Writer
        | FailureKind::Encode => {
            warn!(job_id = %job_id, error = %err, "video processing failed");
        }
        FailureKind::Internal => {
            error!(job_id = %job_id, error = ?err, "video processing failed unexpectedly");
        }
    }
    err.public_message()
}

async fn remove_file(path: &Path) {
    if let Err(e) = FsAdapter::remove_if_exists(path).await {
        warn!(path = %path.display(), error = %e, "cannot remove file");
    }
}
