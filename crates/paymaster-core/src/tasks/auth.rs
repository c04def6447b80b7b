//! Authentication challenge workflow.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ActivityKind, ActivityOutcome};
use crate::engine::{Engine, Expiry, Task};
use crate::error::{EngineError, TaskError};
use crate::ports::{ActivityStore, ApprovalDecision, ApprovalRequest, Reply, ReplyBody};
use crate::providers::ProviderRegistry;

use super::activity::{SaveActivity, SaveActivityArgs};
use super::approval::RequireUserApproval;
use super::respond::SendResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthChallengeArgs {
    pub request_id: String,
    pub challenge: String,
    /// Where the challenge came from, shown in the approval prompt.
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthOutcome {
    Acknowledged,
    AlreadyHandled,
    Deferred,
    Declined { reason: String },
}

/// Handle an incoming authentication challenge: ask the user, answer the
/// peer, record the outcome. Same idempotency discipline as the payment
/// workflow: the activity check runs before any external effect.
pub struct ProcessAuthChallenge {
    args: AuthChallengeArgs,
    activities: Arc<dyn ActivityStore>,
}

impl ProcessAuthChallenge {
    pub fn new(args: AuthChallengeArgs, providers: &ProviderRegistry) -> Result<Self, EngineError> {
        Ok(Self {
            activities: providers.activities()?,
            args,
        })
    }

    async fn reply(&self, engine: &Engine, body: ReplyBody) -> Result<(), TaskError> {
        let send = SendResponse::new(
            Reply {
                request_id: self.args.request_id.clone(),
                body,
            },
            engine.providers(),
        )?;
        engine.run(&send).await
    }

    async fn save(&self, engine: &Engine, outcome: ActivityOutcome) -> Result<(), TaskError> {
        let save = SaveActivity::new(
            SaveActivityArgs {
                kind: ActivityKind::Auth,
                request_id: self.args.request_id.clone(),
                amount_msat: None,
                outcome,
            },
            engine.providers(),
        )?;
        engine.run(&save).await?;
        Ok(())
    }
}

#[async_trait]
impl Task for ProcessAuthChallenge {
    const NAME: &'static str = "paymaster.auth.process.v1";

    type Args = AuthChallengeArgs;
    type Output = AuthOutcome;

    fn args(&self) -> &AuthChallengeArgs {
        &self.args
    }

    fn expiry(&self) -> Expiry {
        Expiry::Skip
    }

    async fn execute(&self, engine: &Engine) -> Result<AuthOutcome, TaskError> {
        if let Some(done) = self.activities.find_by_request(&self.args.request_id).await? {
            debug!(
                request = %self.args.request_id,
                activity = %done.id,
                "auth challenge already handled"
            );
            return Ok(AuthOutcome::AlreadyHandled);
        }

        let approval = RequireUserApproval::new(
            ApprovalRequest {
                request_id: self.args.request_id.clone(),
                summary: format!("Sign in to {}", self.args.origin),
                amount_msat: None,
            },
            engine.providers(),
        )?;
        let Some(decision) = engine.run(&approval).await? else {
            return Ok(AuthOutcome::Deferred);
        };

        if decision == ApprovalDecision::Declined {
            let reason = "sign-in declined by user".to_string();
            self.reply(engine, ReplyBody::Rejected {
                reason: reason.clone(),
            })
            .await?;
            self.save(engine, ActivityOutcome::declined(reason.as_str()))
                .await?;
            return Ok(AuthOutcome::Declined { reason });
        }

        self.reply(engine, ReplyBody::AuthAck).await?;
        self.save(
            engine,
            ActivityOutcome::completed(format!("acknowledged challenge from {}", self.args.origin)),
        )
        .await?;

        Ok(AuthOutcome::Acknowledged)
    }
}
