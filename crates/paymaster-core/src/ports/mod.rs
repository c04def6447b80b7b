//! Ports: interfaces to external collaborators.
//!
//! Each port is an opaque capability. The engine and the workflow tasks only
//! require that the providers they declare resolve to *something* registered
//! before the task is constructed; concrete backends live behind these
//! traits (see `impls` for the bundled ones).

pub mod activities;
pub mod approval;
pub mod clock;
pub mod events;
pub mod notifier;
pub mod protocol;
pub mod relays;
pub mod storage;
pub mod wallet;

pub use activities::ActivityStore;
pub use approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use events::{Event, EventBus};
pub use notifier::{Notice, Notifier};
pub use protocol::{ProtocolClient, Reply, ReplyBody};
pub use relays::RelayStatus;
pub use storage::Storage;
pub use wallet::{PaymentProof, Wallet};
