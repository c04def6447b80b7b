//! Event bus port: change notifications for in-process observers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ActivityId, ActivityKind};
use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    ActivityRecorded {
        id: ActivityId,
        kind: ActivityKind,
        request_id: String,
    },
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn emit(&self, event: &Event) -> Result<(), ProviderError>;
}
