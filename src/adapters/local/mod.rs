//! Local adapters for single-process deployment.

pub mod fs;
pub mod job_registry;
pub mod json_store;

pub use fs::FsAdapter;
pub use job_registry::JobRegistry;
pub use json_store::JsonRecordStore;
