//! Domain layer - Pure types and reductions, no I/O beyond font loading.

pub mod aggregate;
pub mod analytics;
pub mod annotate;
pub mod detection;
pub mod jobs;
pub mod progress;
pub mod records;
pub mod uploads;
