//! Headcount - person counting over uploaded videos
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (records, jobs, aggregation, progress, annotation, analytics)
//! - ports/: Trait definitions (detector, video I/O, record repository)
//! - adapters/: Concrete implementations (local store, HTTP, ffmpeg, ONNX)
//! - application/: Pipeline and video service
//! - config: Environment configuration
//!
//! # Features
//! - `ffmpeg`: Video decode/encode through ffmpeg-next, transcode through the ffmpeg CLI
//! - `onnx`: YOLO person detector on ONNX Runtime

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::pipeline::Pipeline;
pub use application::service::{ServiceSettings, VideoService};
pub use config::AppConfig;
