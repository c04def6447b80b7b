//! Domain model (ids, fingerprints, queue records, activities).

pub mod activity;
pub mod fingerprint;
pub mod ids;
pub mod record;

pub use activity::{Activity, ActivityKind, ActivityOutcome};
pub use fingerprint::Fingerprint;
pub use ids::{ActivityId, Id, IdMarker, RecordId};
pub use record::QueueRecord;
