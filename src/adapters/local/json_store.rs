//! JSON-file VideoRecordRepository implementation.
//!
//! The whole list is rewritten on every mutation.

use crate::domain::records::VideoRecord;
use crate::error::StoreError;
use crate::ports::repository::{RecordMutation, VideoRecordRepository};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

/// Record list persisted as one JSON array.
///
/// One process-wide lock serializes load-mutate-save cycles.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Missing or unreadable content is an empty list, never an error.
    async fn load(&self) -> Vec<VideoRecord> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read record store");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt record store, starting empty"
                );
                Vec::new()
            }
        }
    }

    async fn save(&self, records: &[VideoRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(records)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl VideoRecordRepository for JsonRecordStore {
    async fn append(&self, record: VideoRecord) -> Result<String, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await;
        let id = record.id.clone();
        records.push(record);
        self.save(&records).await?;
        Ok(id)
    }

    async fn update(&self, id: &str, mutate: RecordMutation) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        mutate(record);
        self.save(&records).await?;
        Ok(true)
    }

    async fn get(&self, id: &str) -> Result<Option<VideoRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await.into_iter().find(|r| r.id == id))
    }

    async fn list(&self) -> Result<Vec<VideoRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await)
    }

    async fn delete(&self, id: &str) -> Result<Option<VideoRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let removed = records.remove(index);
        self.save(&records).await?;
        Ok(Some(removed))
    }
}
