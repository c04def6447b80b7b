//! Shared test doubles and a pre-wired engine harness.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::engine::Engine;
use crate::error::ProviderError;
use crate::impls::{MemoryActivityStore, MemoryStorage};
use crate::ports::{
    ApprovalDecision, ApprovalGate, ApprovalRequest, Clock, Event, EventBus, Notice, Notifier,
    PaymentProof, ProtocolClient, RelayStatus, Reply, Wallet,
};
use crate::providers::ProviderRegistry;

/// Wallet double: succeeds with a deterministic proof unless told to fail.
pub(crate) struct FakeWallet {
    pay_count: AtomicU32,
    balance_count: AtomicU32,
    fail_with: Mutex<Option<String>>,
}

impl FakeWallet {
    pub(crate) fn new() -> Self {
        Self {
            pay_count: AtomicU32::new(0),
            balance_count: AtomicU32::new(0),
            fail_with: Mutex::new(None),
        }
    }

    pub(crate) fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn pay_calls(&self) -> u32 {
        self.pay_count.load(Ordering::SeqCst)
    }

    pub(crate) fn balance_calls(&self) -> u32 {
        self.balance_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Wallet for FakeWallet {
    async fn pay_invoice(
        &self,
        invoice: &str,
        _amount_msat: Option<u64>,
    ) -> Result<PaymentProof, ProviderError> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(ProviderError::new("wallet", message));
        }
        self.pay_count.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentProof {
            preimage: format!("preimage:{invoice}"),
            fees_msat: 7,
        })
    }

    async fn balance_msat(&self) -> Result<u64, ProviderError> {
        self.balance_count.fetch_add(1, Ordering::SeqCst);
        Ok(123_456_000)
    }
}

/// Approval gate double. The scripted response is `Some(Approved)` by
/// default; `set(None)` simulates a host that cannot prompt.
pub(crate) struct FakeGate {
    response: Mutex<Option<ApprovalDecision>>,
    fail_with: Mutex<Option<String>>,
    requests: Mutex<Vec<ApprovalRequest>>,
}

impl FakeGate {
    fn approving() -> Self {
        Self {
            response: Mutex::new(Some(ApprovalDecision::Approved)),
            fail_with: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set(&self, response: Option<ApprovalDecision>) {
        *self.response.lock().unwrap() = response;
    }

    pub(crate) fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<ApprovalRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalGate for FakeGate {
    async fn request(
        &self,
        request: &ApprovalRequest,
    ) -> Result<Option<ApprovalDecision>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(ProviderError::new("approvals", message));
        }
        Ok(*self.response.lock().unwrap())
    }
}

/// Relay status double: connected from the `threshold`-th poll onwards.
pub(crate) struct FakeRelays {
    threshold: AtomicU32,
    polls: AtomicU32,
}

impl FakeRelays {
    fn connected() -> Self {
        Self {
            threshold: AtomicU32::new(1),
            polls: AtomicU32::new(0),
        }
    }

    pub(crate) fn connect_after(&self, polls: u32) {
        self.threshold.store(polls, Ordering::SeqCst);
    }

    pub(crate) fn never_connect(&self) {
        self.threshold.store(u32::MAX, Ordering::SeqCst);
    }

    pub(crate) fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayStatus for FakeRelays {
    async fn is_connected(&self) -> bool {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        poll >= self.threshold.load(Ordering::SeqCst)
    }
}

pub(crate) struct RecordingProtocol {
    sent: Mutex<Vec<Reply>>,
}

impl RecordingProtocol {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<Reply> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProtocolClient for RecordingProtocol {
    async fn send_reply(&self, reply: &Reply) -> Result<(), ProviderError> {
        self.sent.lock().unwrap().push(reply.clone());
        Ok(())
    }
}

pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), ProviderError> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

pub(crate) struct RecordingBus {
    events: Mutex<Vec<Event>>,
}

impl RecordingBus {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn emitted(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn emit(&self, event: &Event) -> Result<(), ProviderError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Clock that follows tokio's (possibly paused) time, so cache TTLs expire
/// in step with `tokio::time::sleep` in `start_paused` tests.
pub(crate) struct MonotonicTestClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl MonotonicTestClock {
    pub(crate) fn start() -> Self {
        Self {
            base: Utc::now(),
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for MonotonicTestClock {
    fn now(&self) -> DateTime<Utc> {
        self.base
            + chrono::Duration::from_std(self.started.elapsed())
                .expect("elapsed test time fits in a chrono duration")
    }
}

/// A fully wired engine over in-memory providers, with every double
/// reachable for assertions.
pub(crate) struct TestHarness {
    pub(crate) protocol: Arc<RecordingProtocol>,
    pub(crate) wallet: Arc<FakeWallet>,
    pub(crate) gate: Arc<FakeGate>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) events: Arc<RecordingBus>,
    pub(crate) relays: Arc<FakeRelays>,
    pub(crate) activities: Arc<MemoryActivityStore>,
    storage: Arc<MemoryStorage>,
    engine: Engine,
}

impl TestHarness {
    pub(crate) fn new() -> Self {
        Self::build(Arc::new(crate::ports::SystemClock), true)
    }

    pub(crate) fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::build(clock, true)
    }

    pub(crate) fn without_wallet() -> Self {
        Self::build(Arc::new(crate::ports::SystemClock), false)
    }

    fn build(clock: Arc<dyn Clock>, with_wallet: bool) -> Self {
        let registry = Arc::new(ProviderRegistry::new());
        registry.set_clock(Arc::clone(&clock));

        let storage = Arc::new(MemoryStorage::with_clock(clock));
        registry.set_storage(storage.clone());

        let protocol = Arc::new(RecordingProtocol::new());
        registry.set_protocol(protocol.clone());

        let wallet = Arc::new(FakeWallet::new());
        if with_wallet {
            registry.set_wallet(wallet.clone());
        }

        let gate = Arc::new(FakeGate::approving());
        registry.set_approvals(gate.clone());

        let notifier = Arc::new(RecordingNotifier::new());
        registry.set_notifier(notifier.clone());

        let events = Arc::new(RecordingBus::new());
        registry.set_events(events.clone());

        let relays = Arc::new(FakeRelays::connected());
        registry.set_relays(relays.clone());

        let activities = Arc::new(MemoryActivityStore::new());
        registry.set_activities(activities.clone());

        let engine = Engine::new(registry).expect("storage is registered");

        Self {
            protocol,
            wallet,
            gate,
            notifier,
            events,
            relays,
            activities,
            storage,
            engine,
        }
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn into_engine(self) -> Engine {
        self.engine
    }

    pub(crate) fn storage(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }
}
