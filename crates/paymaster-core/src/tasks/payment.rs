//! One-time payment request workflow.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{ActivityKind, ActivityOutcome};
use crate::engine::{Engine, Expiry, Task};
use crate::error::{EngineError, TaskError};
use crate::ports::{
    ActivityStore, ApprovalDecision, ApprovalRequest, Reply, ReplyBody, Wallet,
};
use crate::providers::ProviderRegistry;

use super::activity::{SaveActivity, SaveActivityArgs};
use super::approval::RequireUserApproval;
use super::respond::SendResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequestArgs {
    /// Identifier of the incoming protocol request; the idempotency key.
    pub request_id: String,
    pub invoice: String,
    pub amount_msat: Option<u64>,
    /// Who asked (peer identifier), for the approval prompt.
    pub requester: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Completed { preimage: String, fees_msat: u64 },
    AlreadyHandled,
    /// Could not prompt the user; a notification was raised and the
    /// workflow stopped here.
    Deferred,
    Declined { reason: String },
}

/// Handle an incoming one-time payment request.
///
/// The queue dispatches at-least-once, so the first step is an idempotency
/// check against the recorded activity for this request id; everything with
/// an external effect happens after it. Outcomes are not memoized, since a
/// deferred request must be processable again on the next dispatch; that is
/// safe precisely because of the activity check.
pub struct ProcessPaymentRequest {
    args: PaymentRequestArgs,
    wallet: Arc<dyn Wallet>,
    activities: Arc<dyn ActivityStore>,
}

impl std::fmt::Debug for ProcessPaymentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessPaymentRequest")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl ProcessPaymentRequest {
    pub fn new(args: PaymentRequestArgs, providers: &ProviderRegistry) -> Result<Self, EngineError> {
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
                kind: ActivityKind::Payment,
                request_id: self.args.request_id.clone(),
                amount_msat: self.args.amount_msat,
                outcome,
            },
            engine.providers(),
        )?;
        engine.run(&save).await?;
        Ok(())
    }
}

#[async_trait]
impl Task for ProcessPaymentRequest {
    const NAME: &'static str = "paymaster.payment.process.v1";

    type Args = PaymentRequestArgs;
    type Output = PaymentOutcome;

    fn args(&self) -> &PaymentRequestArgs {
        &self.args
    }

    fn expiry(&self) -> Expiry {
        Expiry::Skip
    }

    async fn execute(&self, engine: &Engine) -> Result<PaymentOutcome, TaskError> {
        if let Some(done) = self.activities.find_by_request(&self.args.request_id).await? {
            debug!(
                request = %self.args.request_id,
                activity = %done.id,
                "payment request already handled"
            );
            return Ok(PaymentOutcome::AlreadyHandled);
        }

        let approval = RequireUserApproval::new(
            ApprovalRequest {
                request_id: self.args.request_id.clone(),
                summary: format!(
                    "Payment of {} requested by {}",
                    self.args
                        .amount_msat
                        .map_or_else(|| "invoice amount".to_string(), |a| format!("{a} msat")),
                    self.args.requester
                ),
                amount_msat: self.args.amount_msat,
            },
            engine.providers(),
        )?;
        let Some(decision) = engine.run(&approval).await? else {
            return Ok(PaymentOutcome::Deferred);
        };

        if decision == ApprovalDecision::Declined {
            let reason = "payment declined by user".to_string();
            self.reply(engine, ReplyBody::Rejected {
                reason: reason.clone(),
            })
            .await?;
            self.save(engine, ActivityOutcome::declined(reason.as_str()))
                .await?;
            return Ok(PaymentOutcome::Declined { reason });
        }

        let proof = match self
            .wallet
            .pay_invoice(&self.args.invoice, self.args.amount_msat)
            .await
        {
            Ok(proof) => proof,
            Err(err) => {
                let reason = err.to_string();
                // Best effort: the peer should hear about the failure even
                // if the reply path is flaky too.
                if let Err(reply_err) = self
                    .reply(engine, ReplyBody::Rejected {
                        reason: reason.clone(),
                    })
                    .await
                {
                    warn!(
                        request = %self.args.request_id,
                        error = %reply_err,
                        "could not deliver payment failure reply"
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
            ActivityOutcome::completed(format!("paid, fees {} msat", proof.fees_msat)),
        )
        .await?;

        Ok(PaymentOutcome::Completed {
            preimage: proof.preimage,
            fees_msat: proof.fees_msat,
        })
    }
}
