//! Memoized, dedup-safe task execution.

mod inflight;
pub mod task;

pub use task::{Expiry, Task};

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::Fingerprint;
use crate::error::{EngineError, TaskError};
use crate::ports::Storage;
use crate::providers::ProviderRegistry;
use crate::queue::DurableQueue;
use inflight::{Claim, InFlightTable};

/// The execution engine; one per process.
///
/// Every `run()` call funnels through the same path, whether it came from a
/// direct call, the enqueue-and-run fast path, or a queue drain:
///
/// 1. a non-expired cached result is decoded and returned: no provider
///    calls, no side effects;
/// 2. an in-flight execution for the same key is joined; concurrent callers
///    never trigger the body twice;
/// 3. otherwise the body runs; a successful result is persisted with the
///    task's expiry before the in-flight entry clears, a failure clears the
///    entry without a cache write so the next identical call re-attempts.
pub struct Engine {
    providers: Arc<ProviderRegistry>,
    storage: Arc<dyn Storage>,
    queue: DurableQueue,
    inflight: InFlightTable,
}

impl Engine {
    /// Fails fast when the storage provider is not registered: without
    /// storage there is no cache and no durable queue.
    pub fn new(providers: Arc<ProviderRegistry>) -> Result<Self, EngineError> {
        let storage = providers.storage()?;
        let queue = DurableQueue::new(Arc::clone(&storage), providers.clock());
        Ok(Self {
            providers,
            storage,
            queue,
            inflight: InFlightTable::new(),
        })
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn queue(&self) -> &DurableQueue {
        &self.queue
    }

    /// Run a task to completion, memoized and deduplicated.
    pub async fn run<T: Task>(&self, task: &T) -> Result<T::Output, TaskError> {
        let args = serde_json::to_value(task.args())
            .map_err(|e| TaskError::Codec(format!("encode arguments for {}: {e}", T::NAME)))?;
        let key = memo_key(T::NAME, &args);

        if let Some(raw) = self.storage.cache_get(&key).await? {
            debug!(task = T::NAME, "returning memoized result");
            return serde_json::from_str(&raw)
                .map_err(|e| TaskError::Codec(format!("decode cached result for {}: {e}", T::NAME)));
        }

        match self.inflight.claim(&key) {
            Claim::Joined(mut rx) => {
                debug!(task = T::NAME, "joining in-flight execution");
                let settled = rx
                    .wait_for(|slot| slot.is_some())
                    .await
                    .map_err(|_| TaskError::Abandoned(key.clone()))?
                    .clone()
                    .unwrap_or_else(|| Err(TaskError::Abandoned(key.clone())));
                match settled {
                    Ok(value) => serde_json::from_value(value).map_err(|e| {
                        TaskError::Codec(format!("decode shared result for {}: {e}", T::NAME))
                    }),
                    Err(err) => Err(err),
                }
            }
            Claim::Owner(slot) => {
                debug!(task = T::NAME, "executing task body");
                let settled: Result<(T::Output, Value), TaskError> = async {
                    let output = task.execute(self).await?;
                    let value = serde_json::to_value(&output).map_err(|e| {
                        TaskError::Codec(format!("encode result for {}: {e}", T::NAME))
                    })?;
                    match task.expiry() {
                        Expiry::Skip => {}
                        Expiry::Forever => {
                            self.storage.cache_set(&key, value.to_string(), None).await?;
                        }
                        Expiry::Until(at) => {
                            self.storage
                                .cache_set(&key, value.to_string(), Some(at))
                                .await?;
                        }
                    }
                    Ok((output, value))
                }
                .await;

                match settled {
                    Ok((output, value)) => {
                        slot.settle(Ok(value));
                        Ok(output)
                    }
                    Err(err) => {
                        slot.settle(Err(err.clone()));
                        Err(err)
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn inflight_len(&self) -> usize {
        self.inflight.len()
    }
}

pub(crate) fn memo_key(name: &str, args: &Value) -> String {
    format!("{name}:{}", Fingerprint::of(args))
}
