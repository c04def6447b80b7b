//! User approval step.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::engine::{Engine, Expiry, Task};
use crate::error::{EngineError, TaskError};
use crate::ports::{ApprovalDecision, ApprovalGate, ApprovalRequest, Notice, Notifier};
use crate::providers::ProviderRegistry;

/// Suspend until a human answers, or until the host decides it cannot
/// prompt.
///
/// Resolves to `None` when prompting is impossible (for example while the
/// app is backgrounded); in that case a notification has been raised and the
/// caller is expected to stop its workflow. Decisions are never memoized: a
/// later run of the same workflow must be able to prompt again. Concurrent
/// identical requests still collapse onto a single prompt via the in-flight
/// table.
pub struct RequireUserApproval {
    args: ApprovalRequest,
    approvals: Arc<dyn ApprovalGate>,
    notifier: Arc<dyn Notifier>,
}

impl RequireUserApproval {
    pub fn new(args: ApprovalRequest, providers: &ProviderRegistry) -> Result<Self, EngineError> {
        Ok(Self {
            approvals: providers.approvals()?,
            notifier: providers.notifier()?,
            args,
        })
    }
}

#[async_trait]
impl Task for RequireUserApproval {
    const NAME: &'static str = "paymaster.approval.require.v1";

    type Args = ApprovalRequest;
    type Output = Option<ApprovalDecision>;

    fn args(&self) -> &ApprovalRequest {
        &self.args
    }

    fn expiry(&self) -> Expiry {
        Expiry::Skip
    }

    async fn execute(&self, _engine: &Engine) -> Result<Option<ApprovalDecision>, TaskError> {
        match self.approvals.request(&self.args).await? {
            Some(decision) => {
                debug!(request = %self.args.request_id, ?decision, "user answered");
                Ok(Some(decision))
            }
            None => {
                debug!(
                    request = %self.args.request_id,
                    "cannot prompt, raising a notification instead"
                );
                self.notifier
                    .notify(&Notice {
                        title: "Approval needed".to_string(),
                        body: format!("{} is waiting for your approval", self.args.summary),
                    })
                    .await?;
                Ok(None)
            }
        }
    }
}
