//! Queue drainer: catch-up processing and the enqueue-and-run fast path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::QueueRecord;
use crate::engine::Engine;
use crate::error::{StorageError, TaskError};
use crate::tasks::TaskKind;

use super::EnqueueOptions;

/// What one drain pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub executed: u64,
    pub failed: u64,
}

impl Engine {
    /// Run the queue drainer to exhaustion.
    ///
    /// Used as a startup catch-up pass and after connectivity or permission
    /// changes. Each record is extracted, revived, run, and then deleted
    /// regardless of the run's outcome; failures (including records naming
    /// an unknown task or carrying malformed arguments) are logged and
    /// counted, and the drain moves on.
    pub async fn drain_queue_once(&self) -> Result<DrainReport, StorageError> {
        let mut report = DrainReport::default();
        loop {
            let Some(record) = self.queue().extract_next().await? else {
                break;
            };

            match self.dispatch_record(&record).await {
                Ok(_) => report.executed += 1,
                Err(err) => {
                    warn!(
                        task = %record.task_name,
                        record = %record.id,
                        error = %err,
                        "queued task failed"
                    );
                    report.failed += 1;
                }
            }

            // Delete even after a failure: forward progress over guaranteed
            // delivery. A crash before this line leaves the record for the
            // next drain.
            self.queue().delete(record.id).await?;
        }

        debug!(
            executed = report.executed,
            failed = report.failed,
            "queue drained"
        );
        Ok(report)
    }

    /// Persist a task record, then immediately run it inline and delete the
    /// record.
    ///
    /// This is the latency-sensitive path for freshly observed events: the
    /// caller gets the result right away, and if the process dies before the
    /// inline run completes, the record survives for the next drain.
    pub async fn enqueue_and_run(
        &self,
        kind: TaskKind,
        options: EnqueueOptions,
    ) -> Result<Value, TaskError> {
        let args = kind.args_value()?;
        let id = self.queue().enqueue(kind.name(), args, options).await?;

        let result = kind.dispatch(self).await;

        if let Err(err) = self.queue().delete(id).await {
            // The record will be re-dispatched by a later drain; memoization
            // and the workflows' own idempotency checks make that safe.
            warn!(record = %id, error = %err, "could not delete record after inline run");
        }
        result
    }

    async fn dispatch_record(&self, record: &QueueRecord) -> Result<Value, TaskError> {
        let kind = TaskKind::decode(&record.task_name, record.args.clone())?;
        kind.dispatch(self).await
    }
}
