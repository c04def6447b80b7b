//! Workflow task kinds.
//!
//! [`TaskKind`] is the closed set of tasks the durable queue can persist and
//! revive. Decoding dispatches on the persisted task name; a record naming
//! anything else is a [`DecodeError::UnknownTaskName`], and adding a variant
//! forces every match below to handle it. Revival resolves providers
//! against the registry's *current* state, so a record enqueued before a
//! wallet swap runs against the wallet that is active when it is revived.
//!
//! The short-lived composition steps (approval, respond, save-activity,
//! connectivity, balance) are ordinary tasks too, but only ever run
//! in-memory as part of a parent workflow, so they have no variant here.

mod activity;
mod approval;
mod auth;
mod balance;
mod connectivity;
mod payment;
mod respond;
mod subscription;

pub use activity::{SaveActivity, SaveActivityArgs};
pub use approval::RequireUserApproval;
pub use auth::{AuthChallengeArgs, AuthOutcome, ProcessAuthChallenge};
pub use balance::{GetBalance, GetBalanceArgs};
pub use connectivity::{
    CheckConnectivityArgs, CheckRelayConnectivity, WaitForRelaysArgs, WaitForRelaysConnected,
};
pub use payment::{PaymentOutcome, PaymentRequestArgs, ProcessPaymentRequest};
pub use respond::SendResponse;
pub use subscription::{ProcessSubscriptionCycle, SubscriptionCycleArgs, SubscriptionOutcome};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{Engine, Task};
use crate::error::{DecodeError, TaskError};

/// The queueable task kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", content = "args", rename_all = "snake_case")]
pub enum TaskKind {
    PaymentRequest(PaymentRequestArgs),
    AuthChallenge(AuthChallengeArgs),
    SubscriptionCycle(SubscriptionCycleArgs),
}

impl TaskKind {
    /// The persisted task name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::PaymentRequest(_) => ProcessPaymentRequest::NAME,
            TaskKind::AuthChallenge(_) => ProcessAuthChallenge::NAME,
            TaskKind::SubscriptionCycle(_) => ProcessSubscriptionCycle::NAME,
        }
    }

    /// The encoded argument tuple, as persisted in a queue record.
    pub fn args_value(&self) -> Result<Value, TaskError> {
        let encoded = match self {
            TaskKind::PaymentRequest(args) => serde_json::to_value(args),
            TaskKind::AuthChallenge(args) => serde_json::to_value(args),
            TaskKind::SubscriptionCycle(args) => serde_json::to_value(args),
        };
        encoded.map_err(|e| TaskError::Codec(format!("encode arguments for {}: {e}", self.name())))
    }

    /// Revive a persisted record's (name, args) pair.
    pub fn decode(name: &str, args: Value) -> Result<Self, DecodeError> {
        let malformed = |e: serde_json::Error| DecodeError::MalformedArgs {
            name: name.to_string(),
            message: e.to_string(),
        };

        match name {
            n if n == ProcessPaymentRequest::NAME => Ok(TaskKind::PaymentRequest(
                serde_json::from_value(args).map_err(malformed)?,
            )),
            n if n == ProcessAuthChallenge::NAME => Ok(TaskKind::AuthChallenge(
                serde_json::from_value(args).map_err(malformed)?,
            )),
            n if n == ProcessSubscriptionCycle::NAME => Ok(TaskKind::SubscriptionCycle(
                serde_json::from_value(args).map_err(malformed)?,
            )),
            _ => Err(DecodeError::UnknownTaskName(name.to_string())),
        }
    }

    /// Construct the concrete task against the registry's current providers
    /// and run it, erasing the output for the caller.
    pub async fn dispatch(self, engine: &Engine) -> Result<Value, TaskError> {
        match self {
            TaskKind::PaymentRequest(args) => {
                let task = ProcessPaymentRequest::new(args, engine.providers())?;
                erase::<ProcessPaymentRequest>(engine.run(&task).await?)
            }
            TaskKind::AuthChallenge(args) => {
                let task = ProcessAuthChallenge::new(args, engine.providers())?;
                erase::<ProcessAuthChallenge>(engine.run(&task).await?)
            }
            TaskKind::SubscriptionCycle(args) => {
                let task = ProcessSubscriptionCycle::new(args, engine.providers())?;
                erase::<ProcessSubscriptionCycle>(engine.run(&task).await?)
            }
        }
    }
}

fn erase<T: Task>(output: T::Output) -> Result<Value, TaskError> {
    serde_json::to_value(&output)
        .map_err(|e| TaskError::Codec(format!("encode result for {}: {e}", T::NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestHarness;
    use rstest::rstest;
    use serde_json::json;

    fn payment() -> TaskKind {
        TaskKind::PaymentRequest(PaymentRequestArgs {
            request_id: "req-1".to_string(),
            invoice: "lnbc1...".to_string(),
            amount_msat: Some(1_000),
            requester: "npub1peer".to_string(),
        })
    }

    fn auth() -> TaskKind {
        TaskKind::AuthChallenge(AuthChallengeArgs {
            request_id: "req-2".to_string(),
            challenge: "nonce".to_string(),
            origin: "https://app.example".to_string(),
        })
    }

    fn subscription() -> TaskKind {
        TaskKind::SubscriptionCycle(SubscriptionCycleArgs {
            request_id: "req-3".to_string(),
            subscription_id: "sub-1".to_string(),
            period: "2026-08".to_string(),
            invoice: "lnbc2...".to_string(),
            amount_msat: 1_000,
            cap_msat: 2_000,
        })
    }

    #[rstest]
    #[case::payment(payment())]
    #[case::auth(auth())]
    #[case::subscription(subscription())]
    fn every_kind_round_trips_through_its_record_encoding(#[case] kind: TaskKind) {
        let name = kind.name();
        let args = kind.args_value().unwrap();

        let revived = TaskKind::decode(name, args).unwrap();
        assert_eq!(revived, kind);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = TaskKind::decode("paymaster.rug.pull.v1", json!({})).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownTaskName(name) if name == "paymaster.rug.pull.v1"));
    }

    #[test]
    fn malformed_args_are_rejected_with_the_task_name() {
        let err =
            TaskKind::decode(ProcessAuthChallenge::NAME, json!({ "request_id": 1 })).unwrap_err();
        assert!(
            matches!(err, DecodeError::MalformedArgs { name, .. } if name == ProcessAuthChallenge::NAME)
        );
    }

    #[tokio::test]
    async fn a_revived_task_produces_the_same_result_as_the_original() {
        // Two identically provisioned processes: one runs the task directly,
        // the other revives it from its record encoding.
        let TaskKind::AuthChallenge(args) = auth() else {
            unreachable!()
        };

        let direct = TestHarness::new();
        let task = ProcessAuthChallenge::new(args, direct.engine().providers()).unwrap();
        let outcome_direct = direct.engine().run(&task).await.unwrap();

        let revived = TestHarness::new();
        let kind = TaskKind::decode(auth().name(), auth().args_value().unwrap()).unwrap();
        let TaskKind::AuthChallenge(args) = kind else {
            unreachable!()
        };
        let task = ProcessAuthChallenge::new(args, revived.engine().providers()).unwrap();
        let outcome_revived = revived.engine().run(&task).await.unwrap();

        assert_eq!(outcome_direct, outcome_revived);
    }

    #[tokio::test]
    async fn dispatch_reresolves_providers_at_revival_time() {
        use crate::testutil::FakeWallet;
        use std::sync::Arc;

        let harness = TestHarness::new();
        let engine = harness.engine();

        // The wallet is swapped after the record was written but before it
        // is revived; the revived task must use the new wallet.
        let replacement = Arc::new(FakeWallet::new());
        engine.providers().set_wallet(replacement.clone());

        let value = payment().dispatch(engine).await.unwrap();
        let outcome: PaymentOutcome = serde_json::from_value(value).unwrap();

        assert!(matches!(outcome, PaymentOutcome::Completed { .. }));
        assert_eq!(replacement.pay_calls(), 1);
        assert_eq!(harness.wallet.pay_calls(), 0);
    }
}
