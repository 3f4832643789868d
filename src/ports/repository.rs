use crate::domain::records::VideoRecord;
use crate::error::StoreError;
use async_trait::async_trait;

pub type RecordMutation = Box<dyn FnOnce(&mut VideoRecord) + Send>;

/// Durable, ordered list of video records.
///
/// Every mutation must be atomic with respect to concurrent callers.
#[async_trait]
pub trait VideoRecordRepository: Send + Sync {
    /// Appends a record and returns its id.
    async fn append(&self, record: VideoRecord) -> Result<String, StoreError>;

    /// Applies `mutate` to the record with `id`. Returns false if there is none.
    async fn update(&self, id: &str, mutate: RecordMutation) -> Result<bool, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<VideoRecord>, StoreError>;

    /// All records in append order.
    async fn list(&self) -> Result<Vec<VideoRecord>, StoreError>;

    /// Removes the record with `id`, returning it.
    async fn delete(&self, id: &str) -> Result<Option<VideoRecord>, StoreError>;
}
