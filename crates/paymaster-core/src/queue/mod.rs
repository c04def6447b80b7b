//! Durable task queue over the storage port.

mod drainer;

pub use drainer::DrainReport;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{QueueRecord, RecordId};
use crate::error::StorageError;
use crate::ports::{Clock, Storage};

/// Knobs for a new queue record.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Higher dispatches first; ties dispatch oldest-first.
    pub priority: i64,

    /// Records past this instant are never dispatched.
    pub expires_at: Option<DateTime<Utc>>,
}

impl EnqueueOptions {
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Append-only, priority-ordered store of not-yet-executed task records.
///
/// Extraction does not delete: the caller deletes after its attempt, whether
/// the attempt succeeded or failed. A crash between extraction and deletion
/// leaves the record for a later drain; a body that throws still gets its
/// record deleted, so a permanently failing task cannot wedge the queue.
pub struct DurableQueue {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl DurableQueue {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Persist a record for later (or immediate) execution.
    pub async fn enqueue(
        &self,
        task_name: &str,
        args: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<RecordId, StorageError> {
        let now = self.clock.now();
        let record = QueueRecord {
            id: RecordId::generate(now),
            task_name: task_name.to_string(),
            args,
            added_at: now,
            expires_at: options.expires_at,
            priority: options.priority,
        };
        debug!(
            task = task_name,
            record = %record.id,
            priority = record.priority,
            "enqueued task record"
        );
        self.storage.queue_enqueue(record.clone()).await?;
        Ok(record.id)
    }

    /// The next record in dispatch order, without deleting it.
    pub async fn extract_next(&self) -> Result<Option<QueueRecord>, StorageError> {
        self.storage.queue_extract_next().await
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), StorageError> {
        self.storage.queue_delete(id).await
    }

    /// Best-effort sweep of expired records; returns how many were removed.
    pub async fn cleanup_expired(&self) -> Result<u64, StorageError> {
        let removed = self.storage.queue_cleanup_expired().await?;
        if removed > 0 {
            debug!(removed, "removed expired queue records");
        }
        Ok(removed)
    }
}
