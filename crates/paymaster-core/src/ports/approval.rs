//! Approval gate port: suspends a workflow on a human decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// What the user is being asked to approve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: String,
    pub summary: String,
    pub amount_msat: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Declined,
}

/// `Ok(None)` means the host cannot prompt right now (e.g. it is running in
/// a background execution window); the caller is expected to raise a
/// notification and stop.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn request(
        &self,
        request: &ApprovalRequest,
    ) -> Result<Option<ApprovalDecision>, ProviderError>;
}
