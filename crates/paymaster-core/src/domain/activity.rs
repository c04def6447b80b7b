//! Recorded activities: the durable outcome of a handled request.
//!
//! Workflows that perform externally visible effects check for an existing
//! activity keyed by the originating request before doing anything, which is
//! what makes a re-dispatched queue record safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ActivityId;

/// Which workflow produced the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Payment,
    Auth,
    Subscription,
}

/// How the request ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActivityOutcome {
    Completed { detail: String },
    Declined { reason: String },
    Failed { reason: String },
}

impl ActivityOutcome {
    pub fn completed(detail: impl Into<String>) -> Self {
        Self::Completed {
            detail: detail.into(),
        }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        Self::Declined {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// One handled request, keyed by the originating request's identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub kind: ActivityKind,
    pub request_id: String,
    pub amount_msat: Option<u64>,
    pub outcome: ActivityOutcome,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        kind: ActivityKind,
        request_id: impl Into<String>,
        amount_msat: Option<u64>,
        outcome: ActivityOutcome,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActivityId::generate(now),
            kind,
            request_id: request_id.into(),
            amount_msat,
            outcome,
            created_at: now,
        }
    }
}
