//! In-memory job progress registry.

use crate::domain::jobs::{JobState, JobUpdate};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Volatile job states keyed by job id, lost on restart.
///
/// Guarded by its own lock, which is never held while the record store lock is
/// taken or while any frame is processed.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, JobState>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<String, JobState>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, job_id: &str) -> Option<JobState> {
        self.jobs().get(job_id).cloned()
    }

    /// Merges `update` into the existing entry, creating it if needed. Last write wins.
    pub fn set(&self, job_id: &str, update: JobUpdate) {
        let mut jobs = self.jobs();
        match jobs.get_mut(job_id) {
            Some(state) => state.apply(update),
            None => {
                jobs.insert(job_id.to_string(), JobState::from_update(job_id, update));
            }
        }
    }

    /// Merges `update` only if the job is still registered. Returns false otherwise.
    pub fn update_existing(&self, job_id: &str, update: JobUpdate) -> bool {
        match self.jobs().get_mut(job_id) {
            Some(state) => {
                state.apply(update);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, job_id: &str) -> Option<JobState> {
        self.jobs().remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
