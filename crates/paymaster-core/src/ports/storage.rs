//! Storage port.
//!
//! The engine depends only on this contract, not on any specific backend.
//! Two independent keyspaces share one engine: the memo cache and the
//! durable task queue.
//!
//! Contract notes:
//! - expired cache entries and expired queue records are never returned,
//!   even before a cleanup sweep removes them;
//! - `queue_extract_next` does NOT delete the record it returns. Deletion is
//!   the caller's explicit responsibility after the attempt, whether the
//!   attempt succeeded or failed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{QueueRecord, RecordId};
use crate::error::StorageError;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a non-expired cache entry.
    async fn cache_get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write (or overwrite) a cache entry. `None` means "never expires".
    async fn cache_set(
        &self,
        key: &str,
        value: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError>;

    async fn cache_delete(&self, key: &str) -> Result<(), StorageError>;

    /// Best-effort maintenance sweep; returns the number of entries removed.
    async fn cache_cleanup_expired(&self) -> Result<u64, StorageError>;

    /// Persist a new queue record.
    async fn queue_enqueue(&self, record: QueueRecord) -> Result<(), StorageError>;

    /// The highest-priority, oldest, non-expired record, without deleting it.
    async fn queue_extract_next(&self) -> Result<Option<QueueRecord>, StorageError>;

    async fn queue_delete(&self, id: RecordId) -> Result<(), StorageError>;

    /// Best-effort maintenance sweep; returns the number of records removed.
    async fn queue_cleanup_expired(&self) -> Result<u64, StorageError>;
}
