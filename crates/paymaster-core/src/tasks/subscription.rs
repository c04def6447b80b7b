//! Recurring-payment (subscription cycle) workflow.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{ActivityKind, ActivityOutcome};
use crate::engine::{Engine, Expiry, Task};
use crate::error::{EngineError, TaskError};
use crate::ports::{ActivityStore, Reply, ReplyBody, Wallet};
use crate::providers::ProviderRegistry;

use super::activity::{SaveActivity, SaveActivityArgs};
use super::respond::SendResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionCycleArgs {
    pub request_id: String,
    pub subscription_id: String,
    /// Billing period label, e.g. "2026-08". One payment per period.
    pub period: String,
    pub invoice: String,
    pub amount_msat: u64,
    /// Per-cycle cap from the standing authorization.
    pub cap_msat: u64,
}

impl SubscriptionCycleArgs {
    /// The idempotency key: a subscription pays at most once per period, no
    /// matter how many times the request is delivered.
    pub fn cycle_key(&self) -> String {
        format!("{}#{}", self.subscription_id, self.period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubscriptionOutcome {
    Paid { preimage: String },
    AlreadyPaid,
    Declined { reason: String },
}

/// Handle one billing cycle of a standing payment authorization. No user
/// prompt: the subscription itself is the pre-approval, bounded by the
/// per-cycle amount cap.
pub struct ProcessSubscriptionCycle {
    args: SubscriptionCycleArgs,
    wallet: Arc<dyn Wallet>,
    activities: Arc<dyn ActivityStore>,
}

impl ProcessSubscriptionCycle {
    pub fn new(
        args: SubscriptionCycleArgs,
        providers: &ProviderRegistry,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            wallet: providers.wallet()?,
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
                kind: ActivityKind::Subscription,
                request_id: self.args.cycle_key(),
                amount_msat: Some(self.args.amount_msat),
                outcome,
            },
            engine.providers(),
        )?;
        engine.run(&save).await?;
        Ok(())
    }
}

#[async_trait]
impl Task for ProcessSubscriptionCycle {
    const NAME: &'static str = "paymaster.subscription.cycle.v1";

    type Args = SubscriptionCycleArgs;
    type Output = SubscriptionOutcome;

    fn args(&self) -> &SubscriptionCycleArgs {
        &self.args
    }

    fn expiry(&self) -> Expiry {
        Expiry::Skip
    }

    async fn execute(&self, engine: &Engine) -> Result<SubscriptionOutcome, TaskError> {
        let cycle_key = self.args.cycle_key();
        if let Some(done) = self.activities.find_by_request(&cycle_key).await? {
            debug!(
                cycle = %cycle_key,
                activity = %done.id,
                "cycle already paid"
            );
            return Ok(SubscriptionOutcome::AlreadyPaid);
        }

        if self.args.amount_msat > self.args.cap_msat {
            let reason = format!(
                "requested {} msat exceeds the {} msat per-cycle cap",
                self.args.amount_msat, self.args.cap_msat
            );
            self.reply(engine, ReplyBody::Rejected {
                reason: reason.clone(),
            })
            .await?;
            self.save(engine, ActivityOutcome::declined(reason.as_str()))
                .await?;
            return Ok(SubscriptionOutcome::Declined { reason });
        }

        let proof = match self
            .wallet
            .pay_invoice(&self.args.invoice, Some(self.args.amount_msat))
            .await
        {
            Ok(proof) => proof,
            Err(err) => {
                let reason = err.to_string();
                if let Err(reply_err) = self
                    .reply(engine, ReplyBody::Rejected {
                        reason: reason.clone(),
                    })
                    .await
                {
                    warn!(
                        cycle = %cycle_key,
                        error = %reply_err,
                        "could not deliver cycle failure reply"
                    );
                }
                self.save(engine, ActivityOutcome::failed(reason.as_str()))
                    .await?;
                return Err(err.into());
            }
        };

        self.reply(engine, ReplyBody::PaymentAck {
            preimage: proof.preimage.clone(),
        })
        .await?;
        self.save(
            engine,
            ActivityOutcome::completed(format!("cycle {} paid", self.args.period)),
        )
        .await?;

        Ok(SubscriptionOutcome::Paid {
            preimage: proof.preimage,
        })
    }
}
