//! In-flight execution table.
//!
//! Concurrent `run()` callers for one memoization key are multiplexed onto a
//! single execution: the first caller claims the key and runs the body,
//! later callers join and await the settled result. Entries are purely
//! in-memory, never persisted, and removed unconditionally when the owning
//! execution settles or is dropped.
//!
//! Locking: the table lock is a plain mutex and is never held across an
//! await point; waiting happens on the per-entry watch channel.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;

use crate::error::TaskError;

/// What an execution settled to, type-erased for fan-out.
pub(crate) type Settled = Result<serde_json::Value, TaskError>;

#[derive(Default)]
pub(crate) struct InFlightTable {
    entries: Mutex<HashMap<String, watch::Receiver<Option<Settled>>>>,
}

/// Outcome of claiming a key.
pub(crate) enum Claim<'a> {
    /// This caller executes the body and must settle the slot.
    Owner(ExecutionSlot<'a>),

    /// Another execution holds the key; await its settled result.
    Joined(watch::Receiver<Option<Settled>>),
}

impl InFlightTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn claim(&self, key: &str) -> Claim<'_> {
        let mut entries = self.entries.lock().expect("in-flight table lock poisoned");
        if let Some(rx) = entries.get(key) {
            return Claim::Joined(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        entries.insert(key.to_string(), rx);
        Claim::Owner(ExecutionSlot {
            table: self,
            key: key.to_string(),
            tx: Some(tx),
        })
    }

    fn remove(&self, key: &str) {
        // Ignore poisoning here: this runs from Drop and must not panic.
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("in-flight table lock poisoned")
            .len()
    }
}

/// Owner-side handle for one claimed key.
pub(crate) struct ExecutionSlot<'a> {
    table: &'a InFlightTable,
    key: String,
    tx: Option<watch::Sender<Option<Settled>>>,
}

impl ExecutionSlot<'_> {
    /// Publish the result to joined waiters. The table entry is removed when
    /// the slot drops, immediately after.
    pub(crate) fn settle(mut self, result: Settled) {
        if let Some(tx) = self.tx.take() {
            // Waiters may all be gone already; that's fine.
            let _ = tx.send(Some(result));
        }
    }
}

impl Drop for ExecutionSlot<'_> {
    fn drop(&mut self) {
        self.table.remove(&self.key);
    }
}
