//! Bundled port implementations.

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryActivityStore, MemoryStorage};
pub use sqlite::SqliteStorage;
