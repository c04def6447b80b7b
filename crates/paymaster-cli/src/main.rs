use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use paymaster_core::error::ProviderError;
use paymaster_core::impls::{MemoryActivityStore, MemoryStorage};
use paymaster_core::ports::{
    ApprovalDecision, ApprovalGate, ApprovalRequest, Event, EventBus, Notice, Notifier,
    PaymentProof, ProtocolClient, RelayStatus, Reply, Wallet,
};
use paymaster_core::tasks::{PaymentRequestArgs, TaskKind};
use paymaster_core::{Engine, EnqueueOptions, ProviderRegistry};

/// Demo wallet: "pays" any invoice instantly.
struct DemoWallet;

#[async_trait]
impl Wallet for DemoWallet {
    async fn pay_invoice(
        &self,
        invoice: &str,
        amount_msat: Option<u64>,
    ) -> Result<PaymentProof, ProviderError> {
        println!(
            "[wallet] paying {invoice} ({})",
            amount_msat.map_or_else(|| "invoice amount".to_string(), |a| format!("{a} msat"))
        );
        Ok(PaymentProof {
            preimage: "0f3a...demo".to_string(),
            fees_msat: 12,
        })
    }

    async fn balance_msat(&self) -> Result<u64, ProviderError> {
        Ok(100_000_000)
    }
}

/// Demo approval surface: approves everything, as if the user tapped "yes".
struct AutoApprove;

#[async_trait]
impl ApprovalGate for AutoApprove {
    async fn request(
        &self,
        request: &ApprovalRequest,
    ) -> Result<Option<ApprovalDecision>, ProviderError> {
        println!("[approval] {} -> approved", request.summary);
        Ok(Some(ApprovalDecision::Approved))
    }
}

struct StdoutProtocol;

#[async_trait]
impl ProtocolClient for StdoutProtocol {
    async fn send_reply(&self, reply: &Reply) -> Result<(), ProviderError> {
        println!("[protocol] reply to {}: {:?}", reply.request_id, reply.body);
        Ok(())
    }
}

struct AlwaysConnected;

#[async_trait]
impl RelayStatus for AlwaysConnected {
    async fn is_connected(&self) -> bool {
        true
    }
}

struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), ProviderError> {
        println!("[notify] {}: {}", notice.title, notice.body);
        Ok(())
    }
}

struct StdoutBus;

#[async_trait]
impl EventBus for StdoutBus {
    async fn emit(&self, event: &Event) -> Result<(), ProviderError> {
        println!("[event] {event:?}");
        Ok(())
    }
}

fn payment_request(request_id: &str) -> TaskKind {
    TaskKind::PaymentRequest(PaymentRequestArgs {
        request_id: request_id.to_string(),
        invoice: "lnbc210n1demo...".to_string(),
        amount_msat: Some(21_000),
        requester: "npub1demo...".to_string(),
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // 1) Register the process-wide providers. Real hosts plug in a SQLite
    //    storage engine, a relay-backed protocol client, and a UI approval
    //    surface here; the demo uses in-process stand-ins.
    let providers = Arc::new(ProviderRegistry::new());
    providers.set_storage(Arc::new(MemoryStorage::new()));
    providers.set_wallet(Arc::new(DemoWallet));
    providers.set_protocol(Arc::new(StdoutProtocol));
    providers.set_relays(Arc::new(AlwaysConnected));
    providers.set_notifier(Arc::new(StdoutNotifier));
    providers.set_events(Arc::new(StdoutBus));
    providers.set_approvals(Arc::new(AutoApprove));
    providers.set_activities(Arc::new(MemoryActivityStore::new()));

    let engine = Engine::new(providers).expect("storage provider is registered");

    // 2) Startup catch-up: run whatever a previous process left behind.
    let report = engine.drain_queue_once().await.expect("drain");
    info!(executed = report.executed, failed = report.failed, "catch-up drain");

    // 3) A payment request arrives: persist it, then run it inline.
    let outcome = engine
        .enqueue_and_run(payment_request("req-0001"), EnqueueOptions::default())
        .await
        .expect("payment workflow");
    println!("outcome: {outcome}");

    // 4) The same request delivered again (at-least-once dispatch): the
    //    recorded activity short-circuits it.
    let outcome = engine
        .enqueue_and_run(payment_request("req-0001"), EnqueueOptions::default())
        .await
        .expect("payment workflow");
    println!("duplicate delivery outcome: {outcome}");
}
