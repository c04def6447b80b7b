//! Protocol client port: replies to the requesting peer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Reply payload for a handled request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyBody {
    PaymentAck { preimage: String },
    AuthAck,
    Rejected { reason: String },
}

/// A reply addressed to the request it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub request_id: String,
    pub body: ReplyBody,
}

#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn send_reply(&self, reply: &Reply) -> Result<(), ProviderError>;
}
