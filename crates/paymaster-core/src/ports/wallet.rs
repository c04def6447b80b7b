//! Wallet port: moves funds and answers balance queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Proof of a settled payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub preimage: String,
    pub fees_msat: u64,
}

impl std::fmt::Debug for dyn Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Wallet")
    }
}

#[async_trait]
pub trait Wallet: Send + Sync {
    /// Pay an invoice. `amount_msat` overrides the invoice amount for
    /// zero-amount invoices.
    async fn pay_invoice(
        &self,
        invoice: &str,
        amount_msat: Option<u64>,
    ) -> Result<PaymentProof, ProviderError>;

    async fn balance_msat(&self) -> Result<u64, ProviderError>;
}
