//! Activity recording step.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Activity, ActivityId, ActivityKind, ActivityOutcome};
use crate::engine::{Engine, Task};
use crate::error::{EngineError, TaskError};
use crate::ports::{ActivityStore, Clock, Event, EventBus};
use crate::providers::ProviderRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveActivityArgs {
    pub kind: ActivityKind,
    pub request_id: String,
    pub amount_msat: Option<u64>,
    pub outcome: ActivityOutcome,
}

/// Record the outcome of a handled request and emit a change notification
/// for observers.
///
/// Cached forever: re-running with the same outcome returns the previously
/// recorded activity id instead of writing a duplicate row.
pub struct SaveActivity {
    args: SaveActivityArgs,
    activities: Arc<dyn ActivityStore>,
    events: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl SaveActivity {
    pub fn new(args: SaveActivityArgs, providers: &ProviderRegistry) -> Result<Self, EngineError> {
        Ok(Self {
            activities: providers.activities()?,
            events: providers.events()?,
            clock: providers.clock(),
            args,
        })
    }
}

#[async_trait]
impl Task for SaveActivity {
    const NAME: &'static str = "paymaster.activity.save.v1";

    type Args = SaveActivityArgs;
    type Output = ActivityId;

    fn args(&self) -> &SaveActivityArgs {
        &self.args
    }

    async fn execute(&self, _engine: &Engine) -> Result<ActivityId, TaskError> {
        let activity = Activity::new(
            self.args.kind,
            self.args.request_id.clone(),
            self.args.amount_msat,
            self.args.outcome.clone(),
            self.clock.now(),
        );
        self.activities.record(&activity).await?;
        self.events
            .emit(&Event::ActivityRecorded {
                id: activity.id,
                kind: activity.kind,
                request_id: activity.request_id.clone(),
            })
            .await?;
        debug!(activity = %activity.id, request = %activity.request_id, "activity recorded");
        Ok(activity.id)
    }
}
