//! Strongly-typed identifiers.
//!
//! IDs are ULIDs behind a phantom-typed wrapper, so a queue record id and an
//! activity id cannot be mixed up at compile time while sharing one
//! implementation. ULIDs sort by creation time, which the durable queue uses
//! as its final dispatch-order tiebreak.

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Marker trait for each id type; provides the display prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic id type. `T` is a zero-sized marker that only exists at compile
/// time.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// Generate a fresh id stamped with the given wall-clock time.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let ulid = Ulid::from_parts(now.timestamp_millis() as u64, rand::random());
        Self::from_ulid(ulid)
    }

    /// Parse the canonical (prefix-free) form produced by [`Id::as_ulid`].
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ulid::from_string(s).map(Self::from_ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for durable queue records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueEntry {}

impl IdMarker for QueueEntry {
    fn prefix() -> &'static str {
        "rec-"
    }
}

/// Marker for recorded activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityEntry {}

impl IdMarker for ActivityEntry {
    fn prefix() -> &'static str {
        "act-"
    }
}

/// Identifier of a durable queue record.
pub type RecordId = Id<QueueEntry>;

/// Identifier of a recorded activity.
pub type ActivityId = Id<ActivityEntry>;
