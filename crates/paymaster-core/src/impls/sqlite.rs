//! SQLite-backed storage engine.
//!
//! This is what makes the queue actually durable: records and cache entries
//! written here survive process death and are picked up by the next drain.
//! Timestamps are stored as unix epoch milliseconds; record ids as their
//! canonical ULID strings.
//!
//! Statements are short and single-row, so the connection sits behind an
//! async mutex rather than a blocking-thread pool.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{QueueRecord, RecordId};
use crate::error::StorageError;
use crate::ports::{Clock, Storage, SystemClock};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS memo_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at_ms INTEGER
);

CREATE TABLE IF NOT EXISTS task_queue (
    id TEXT PRIMARY KEY,
    task_name TEXT NOT NULL,
    args TEXT NOT NULL,
    added_at_ms INTEGER NOT NULL,
    expires_at_ms INTEGER,
    priority INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_task_queue_dispatch
    ON task_queue (priority DESC, added_at_ms ASC, id ASC);
"#;

pub struct SqliteStorage {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path` and apply the schema. The
    /// schema is idempotent, so re-opening an existing database is safe.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        path: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(backend)?;
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }
}

fn backend(err: rusqlite::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn datetime_from_ms(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::Codec(format!("timestamp out of range: {ms}")))
}

fn record_from_row(
    row: (String, String, String, i64, Option<i64>, i64),
) -> Result<QueueRecord, StorageError> {
    let (id, task_name, args, added_at_ms, expires_at_ms, priority) = row;
    Ok(QueueRecord {
        id: RecordId::parse(&id)
            .map_err(|e| StorageError::Codec(format!("record id '{id}': {e}")))?,
        task_name,
        args: serde_json::from_str(&args)
            .map_err(|e| StorageError::Codec(format!("record arguments: {e}")))?,
        added_at: datetime_from_ms(added_at_ms)?,
        expires_at: expires_at_ms.map(datetime_from_ms).transpose()?,
        priority,
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn cache_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().await;
        let row: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at_ms FROM memo_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(backend)?;

        let now_ms = self.now_ms();
        Ok(row.and_then(|(value, expires_at_ms)| {
            match expires_at_ms {
                Some(at) if at <= now_ms => None,
                _ => Some(value),
            }
        }))
    }

    async fn cache_set(
        &self,
        key: &str,
        value: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "
INSERT INTO memo_cache (key, value, expires_at_ms) VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
    value = excluded.value,
    expires_at_ms = excluded.expires_at_ms
",
            params![key, value, expires_at.map(|at| at.timestamp_millis())],
        )
        .map_err(backend)?;
        Ok(())
    }

    async fn cache_delete(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM memo_cache WHERE key = ?1", params![key])
            .map_err(backend)?;
        Ok(())
    }

    async fn cache_cleanup_expired(&self) -> Result<u64, StorageError> {
        let now_ms = self.now_ms();
        let conn = self.conn.lock().await;
        let removed = conn
            .execute(
                "DELETE FROM memo_cache WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?1",
                params![now_ms],
            )
            .map_err(backend)?;
        Ok(removed as u64)
    }

    async fn queue_enqueue(&self, record: QueueRecord) -> Result<(), StorageError> {
        let args = serde_json::to_string(&record.args)
            .map_err(|e| StorageError::Codec(format!("record arguments: {e}")))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "
INSERT INTO task_queue (id, task_name, args, added_at_ms, expires_at_ms, priority)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
",
            params![
                record.id.as_ulid().to_string(),
                record.task_name,
                args,
                record.added_at.timestamp_millis(),
                record.expires_at.map(|at| at.timestamp_millis()),
                record.priority,
            ],
        )
        .map_err(backend)?;
        Ok(())
    }

    async fn queue_extract_next(&self) -> Result<Option<QueueRecord>, StorageError> {
        let now_ms = self.now_ms();
        let conn = self.conn.lock().await;
        let row: Option<(String, String, String, i64, Option<i64>, i64)> = conn
            .query_row(
                "
SELECT id, task_name, args, added_at_ms, expires_at_ms, priority
FROM task_queue
WHERE expires_at_ms IS NULL OR expires_at_ms > ?1
ORDER BY priority DESC, added_at_ms ASC, id ASC
LIMIT 1
",
                params![now_ms],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()
            .map_err(backend)?;

        row.map(record_from_row).transpose()
    }

    async fn queue_delete(&self, id: RecordId) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM task_queue WHERE id = ?1",
            params![id.as_ulid().to_string()],
        )
        .map_err(backend)?;
        Ok(())
    }

    async fn queue_cleanup_expired(&self) -> Result<u64, StorageError> {
        let now_ms = self.now_ms();
        let conn = self.conn.lock().await;
        let removed = conn
            .execute(
                "DELETE FROM task_queue WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?1",
                params![now_ms],
            )
            .map_err(backend)?;
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use crate::queue::{DurableQueue, EnqueueOptions};
    use serde_json::json;
    use tempfile::TempDir;

    fn open(dir: &TempDir, clock: Arc<FixedClock>) -> SqliteStorage {
        SqliteStorage::open_with_clock(dir.path().join("paymaster.db"), clock).unwrap()
    }

    #[tokio::test]
    async fn cache_round_trip_and_lazy_expiry() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let storage = open(&dir, clock.clone());

        storage
            .cache_set(
                "k",
                "{\"n\":1}".to_string(),
                Some(clock.now() + chrono::Duration::seconds(60)),
            )
            .await
            .unwrap();
        assert_eq!(
            storage.cache_get("k").await.unwrap().as_deref(),
            Some("{\"n\":1}")
        );

        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(storage.cache_get("k").await.unwrap(), None);
        assert_eq!(storage.cache_cleanup_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cache_set_overwrites() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let storage = open(&dir, clock);

        storage.cache_set("k", "old".to_string(), None).await.unwrap();
        storage.cache_set("k", "new".to_string(), None).await.unwrap();
        assert_eq!(
            storage.cache_get("k").await.unwrap().as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn dispatch_order_matches_the_contract() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let storage = Arc::new(open(&dir, clock.clone()));
        let queue = DurableQueue::new(storage, clock.clone());

        let opts = EnqueueOptions::default();
        let a = queue
            .enqueue("a", json!({}), opts.with_priority(5))
            .await
            .unwrap();
        clock.advance(chrono::Duration::milliseconds(10));
        let b = queue
            .enqueue("b", json!({}), opts.with_priority(1))
            .await
            .unwrap();
        clock.advance(chrono::Duration::milliseconds(10));
        let c = queue
            .enqueue("c", json!({}), opts.with_priority(5))
            .await
            .unwrap();

        for expected in [a, c, b] {
            let record = queue.extract_next().await.unwrap().unwrap();
            assert_eq!(record.id, expected);
            queue.delete(record.id).await.unwrap();
        }
        assert!(queue.extract_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn queue_records_survive_a_reopen() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::at(Utc::now()));

        let id = {
            let storage = Arc::new(open(&dir, clock.clone()));
            let queue = DurableQueue::new(storage, clock.clone());
            queue
                .enqueue(
                    "paymaster.payment.process.v1",
                    json!({ "request_id": "req-1" }),
                    EnqueueOptions::default().with_priority(3),
                )
                .await
                .unwrap()
            // Connection dropped here: simulated process death.
        };

        let storage = open(&dir, clock);
        let record = storage.queue_extract_next().await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.task_name, "paymaster.payment.process.v1");
        assert_eq!(record.args, json!({ "request_id": "req-1" }));
        assert_eq!(record.priority, 3);
    }

    #[tokio::test]
    async fn expired_queue_records_are_never_returned() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let storage = Arc::new(open(&dir, clock.clone()));
        let queue = DurableQueue::new(storage, clock.clone());

        queue
            .enqueue(
                "stale",
                json!({}),
                EnqueueOptions::default()
                    .with_expires_at(clock.now() + chrono::Duration::minutes(5)),
            )
            .await
            .unwrap();

        clock.advance(chrono::Duration::minutes(6));
        assert!(queue.extract_next().await.unwrap().is_none());
        assert_eq!(queue.cleanup_expired().await.unwrap(), 1);
    }
}
