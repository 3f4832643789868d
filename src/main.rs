//! Headcount binary - single-server deployment
//!
//! Wires up:
//! - ffmpeg video I/O and the YOLO person detector
//! - JSON record store and in-memory job registry
//! - HTTP API and static `/outputs`

use headcount::adapters::ffmpeg::{FfmpegBackend, FfmpegCliTranscoder};
use headcount::adapters::http;
use headcount::adapters::local::{JobRegistry, JsonRecordStore};
use headcount::adapters::onnx::YoloDetector;
use headcount::domain::annotate::Annotator;
use headcount::{AppConfig, Pipeline, ServiceSettings, VideoService};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    for dir in [&config.upload_dir, &config.output_dir] {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            error!(path = %dir.display(), error = %e, "failed to create directory");
            std::process::exit(1);
        }
    }

    // 1. Adapters
    let video = match FfmpegBackend::new() {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "failed to initialize ffmpeg");
            std::process::exit(1);
        }
    };
    let model_path = &config.detection_model_path;
    let detector = match YoloDetector::load(model_path, config.detection_confidence) {
        Ok(detector) => detector,
        Err(e) => {
            error!(error = %e, "failed to load detection model");
            std::process::exit(1);
        }
    };
    let transcoder = FfmpegCliTranscoder::new(config.ffmpeg_bin.clone());
    let annotator = Annotator::with_font_path(config.label_font_path.as_deref());

    let repo = Arc::new(JsonRecordStore::new(config.record_store_path()));
    let jobs = Arc::new(JobRegistry::new());

    // 2. Application
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(video),
        Arc::new(detector),
        Arc::new(transcoder),
        annotator,
    ));
    let service = VideoService::new(repo, jobs, pipeline, ServiceSettings::from(&config));

    // 3. HTTP
    let app = http::router(service, &config.cors_allow_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .expect("Failed to bind TCP listener");
    info!(
        address = %config.bind_address(),
        frame_stride = config.frame_stride,
        workers = config.max_concurrent_jobs,
        "listening"
    );
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
