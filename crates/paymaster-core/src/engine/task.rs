//! The task contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::TaskError;

use super::Engine;

/// Result-reuse policy for a completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Cache the result indefinitely.
    Forever,

    /// Cache the result until the given instant. A timestamp already in the
    /// past disables reuse without disabling the write path.
    Until(DateTime<Utc>),

    /// Never cache the result.
    Skip,
}

/// A unit of work.
///
/// The arguments are the task's serializable identity: together with
/// [`Task::NAME`] they form the memoization key, so two instances with equal
/// arguments are the same computation. Collaborators are not part of the
/// identity; each concrete task resolves them from the provider registry in
/// its constructor and fails fast if one is missing.
///
/// # Naming
/// `NAME` follows `paymaster.{domain}.{action}.v{major}` and is what the
/// durable queue persists, so renaming a task type is a wire change.
///
/// # Composition
/// `execute` receives the engine so a body can `run()` other tasks; every
/// composed step inherits memoization, dedup, and expiry.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    const NAME: &'static str;

    type Args: Serialize + Send + Sync;
    type Output: Serialize + DeserializeOwned + Send + Sync;

    fn args(&self) -> &Self::Args;

    fn expiry(&self) -> Expiry {
        Expiry::Forever
    }

    async fn execute(&self, engine: &Engine) -> Result<Self::Output, TaskError>;
}
