//! Provider registry: the process-wide collaborators tasks resolve at
//! construction time.
//!
//! Design:
//! - One slot per capability; accessors fail fast with
//!   `EngineError::ProviderMissing` so a misconfigured process dies at task
//!   construction, not mid-workflow.
//! - Setters overwrite (last registration wins). A wallet switch or a relay
//!   reconnect is visible to every task constructed afterwards; executions
//!   already running keep the instances they resolved.
//! - The clock slot always holds something (the system clock by default) so
//!   timestamping never fails.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::EngineError;
use crate::ports::{
    ActivityStore, ApprovalGate, Clock, EventBus, Notifier, ProtocolClient, RelayStatus, Storage,
    SystemClock, Wallet,
};

struct Slot<T: ?Sized> {
    name: &'static str,
    value: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> Slot<T> {
    fn empty(name: &'static str) -> Self {
        Self {
            name,
            value: RwLock::new(None),
        }
    }

    fn get(&self) -> Result<Arc<T>, EngineError> {
        self.value
            .read()
            .expect("provider slot lock poisoned")
            .clone()
            .ok_or(EngineError::ProviderMissing(self.name))
    }

    fn set(&self, value: Arc<T>) {
        *self.value.write().expect("provider slot lock poisoned") = Some(value);
        debug!(provider = self.name, "provider registered");
    }
}

pub struct ProviderRegistry {
    storage: Slot<dyn Storage>,
    protocol: Slot<dyn ProtocolClient>,
    wallet: Slot<dyn Wallet>,
    relays: Slot<dyn RelayStatus>,
    notifier: Slot<dyn Notifier>,
    events: Slot<dyn EventBus>,
    activities: Slot<dyn ActivityStore>,
    approvals: Slot<dyn ApprovalGate>,
    clock: RwLock<Arc<dyn Clock>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            storage: Slot::empty("storage"),
            protocol: Slot::empty("protocol"),
            wallet: Slot::empty("wallet"),
            relays: Slot::empty("relays"),
            notifier: Slot::empty("notifier"),
            events: Slot::empty("events"),
            activities: Slot::empty("activities"),
            approvals: Slot::empty("approvals"),
            clock: RwLock::new(Arc::new(SystemClock)),
        }
    }

    pub fn storage(&self) -> Result<Arc<dyn Storage>, EngineError> {
        self.storage.get()
    }

    pub fn set_storage(&self, storage: Arc<dyn Storage>) {
        self.storage.set(storage);
    }

    pub fn protocol(&self) -> Result<Arc<dyn ProtocolClient>, EngineError> {
        self.protocol.get()
    }

    pub fn set_protocol(&self, protocol: Arc<dyn ProtocolClient>) {
        self.protocol.set(protocol);
    }

    pub fn wallet(&self) -> Result<Arc<dyn Wallet>, EngineError> {
        self.wallet.get()
    }

    pub fn set_wallet(&self, wallet: Arc<dyn Wallet>) {
        self.wallet.set(wallet);
    }

    pub fn relays(&self) -> Result<Arc<dyn RelayStatus>, EngineError> {
        self.relays.get()
    }

    pub fn set_relays(&self, relays: Arc<dyn RelayStatus>) {
        self.relays.set(relays);
    }

    pub fn notifier(&self) -> Result<Arc<dyn Notifier>, EngineError> {
        self.notifier.get()
    }

    pub fn set_notifier(&self, notifier: Arc<dyn Notifier>) {
        self.notifier.set(notifier);
    }

    pub fn events(&self) -> Result<Arc<dyn EventBus>, EngineError> {
        self.events.get()
    }

    pub fn set_events(&self, events: Arc<dyn EventBus>) {
        self.events.set(events);
    }

    pub fn activities(&self) -> Result<Arc<dyn ActivityStore>, EngineError> {
        self.activities.get()
    }

    pub fn set_activities(&self, activities: Arc<dyn ActivityStore>) {
        self.activities.set(activities);
    }

    pub fn approvals(&self) -> Result<Arc<dyn ApprovalGate>, EngineError> {
        self.approvals.get()
    }

    pub fn set_approvals(&self, approvals: Arc<dyn ApprovalGate>) {
        self.approvals.set(approvals);
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock
            .read()
            .expect("provider slot lock poisoned")
            .clone()
    }

    pub fn set_clock(&self, clock: Arc<dyn Clock>) {
        *self.clock.write().expect("provider slot lock poisoned") = clock;
        debug!(provider = "clock", "provider registered");
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
