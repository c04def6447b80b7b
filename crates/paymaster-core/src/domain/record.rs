//! Durable queue records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RecordId;

/// One unit of deferred work, as persisted in the durable queue.
///
/// Created on enqueue, read and deleted by the drainer, never mutated in
/// place. Dispatch order is total: `priority` descending, then `added_at`
/// ascending, then `id` ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: RecordId,
    pub task_name: String,
    pub args: serde_json::Value,
    pub added_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub priority: i64,
}

impl QueueRecord {
    /// An expired record is never dispatched, even before a cleanup sweep
    /// removes it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}
