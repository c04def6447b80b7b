//! Relay connectivity port.

use async_trait::async_trait;

/// Reports whether the process currently has relay connectivity. A probe
/// failure counts as "not connected".
#[async_trait]
pub trait RelayStatus: Send + Sync {
    async fn is_connected(&self) -> bool;
}
