//! paymaster-core
//!
//! Task queue and idempotent execution engine for asynchronous wallet
//! workflows (payment requests, auth challenges, subscription billing)
//! inside a host process that can be suspended or killed at any time.
//!
//! Module map:
//! - **domain**: identifiers, argument fingerprints, queue records, activities
//! - **ports**: interfaces to the external collaborators (storage, wallet,
//!   protocol client, relays, notifier, event bus, ...)
//! - **providers**: the process-wide registry tasks resolve collaborators from
//! - **engine**: memoized, dedup-safe task execution
//! - **queue**: the durable priority queue, drainer, and enqueue-and-run
//! - **tasks**: the workflow task kinds composed on top of the engine
//! - **impls**: bundled port implementations (in-memory, SQLite)

pub mod domain;
pub mod engine;
pub mod error;
pub mod impls;
pub mod ports;
pub mod providers;
pub mod queue;
pub mod tasks;

#[cfg(test)]
mod testutil;

pub use engine::{Engine, Expiry, Task};
pub use error::{DecodeError, EngineError, ProviderError, StorageError, TaskError};
pub use providers::ProviderRegistry;
pub use queue::{DrainReport, DurableQueue, EnqueueOptions};
pub use tasks::TaskKind;
