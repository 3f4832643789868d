//! Application layer - Pipeline orchestration and the job driver.

pub mod pipeline;
pub mod service;
