//! In-memory port implementations, for development and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Activity, QueueRecord, RecordId};
use crate::error::{ProviderError, StorageError};
use crate::ports::{ActivityStore, Clock, Storage, SystemClock};

#[derive(Debug, Clone)]
struct CacheSlot {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheSlot {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct MemoryState {
    cache: HashMap<String, CacheSlot>,
    queue: Vec<QueueRecord>,
}

/// Storage backend that keeps everything in process memory.
///
/// Not durable, obviously; it exists so the engine can run without a real
/// database in tests and demos. It still honors the full port contract,
/// including lazy expiry at read time and the total dispatch order.
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory storage lock poisoned")
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// `priority` descending, then `added_at` ascending, then `id` ascending.
fn dispatch_order(a: &QueueRecord, b: &QueueRecord) -> std::cmp::Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.added_at.cmp(&b.added_at))
        .then(a.id.cmp(&b.id))
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn cache_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = self.clock.now();
        let state = self.lock();
        Ok(state
            .cache
            .get(key)
            .filter(|slot| slot.is_fresh(now))
            .map(|slot| slot.value.clone()))
    }

    async fn cache_set(
        &self,
        key: &str,
        value: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock();
        state
            .cache
            .insert(key.to_string(), CacheSlot { value, expires_at });
        Ok(())
    }

    async fn cache_delete(&self, key: &str) -> Result<(), StorageError> {
        let mut state = self.lock();
        state.cache.remove(key);
        Ok(())
    }

    async fn cache_cleanup_expired(&self) -> Result<u64, StorageError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let before = state.cache.len();
        state.cache.retain(|_, slot| slot.is_fresh(now));
        Ok((before - state.cache.len()) as u64)
    }

    async fn queue_enqueue(&self, record: QueueRecord) -> Result<(), StorageError> {
        let mut state = self.lock();
        state.queue.push(record);
        Ok(())
    }

    async fn queue_extract_next(&self) -> Result<Option<QueueRecord>, StorageError> {
        let now = self.clock.now();
        let state = self.lock();
        Ok(state
            .queue
            .iter()
            .filter(|record| !record.is_expired(now))
            .min_by(|a, b| dispatch_order(a, b))
            .cloned())
    }

    async fn queue_delete(&self, id: RecordId) -> Result<(), StorageError> {
        let mut state = self.lock();
        state.queue.retain(|record| record.id != id);
        Ok(())
    }

    async fn queue_cleanup_expired(&self) -> Result<u64, StorageError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let before = state.queue.len();
        state.queue.retain(|record| !record.is_expired(now));
        Ok((before - state.queue.len()) as u64)
    }
}

/// Activity store backed by a plain vector.
#[derive(Default)]
pub struct MemoryActivityStore {
    activities: Mutex<Vec<Activity>>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Activity> {
        self.activities
            .lock()
            .expect("activity store lock poisoned")
            .clone()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn record(&self, activity: &Activity) -> Result<(), ProviderError> {
        self.activities
            .lock()
            .expect("activity store lock poisoned")
            .push(activity.clone());
        Ok(())
    }

    async fn find_by_request(&self, request_id: &str) -> Result<Option<Activity>, ProviderError> {
        Ok(self
            .activities
            .lock()
            .expect("activity store lock poisoned")
            .iter()
            .find(|activity| activity.request_id == request_id)
            .cloned())
    }
}
