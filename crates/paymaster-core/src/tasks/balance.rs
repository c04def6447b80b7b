//! Wallet balance query.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, Expiry, Task};
use crate::error::{EngineError, TaskError};
use crate::ports::Wallet;
use crate::providers::ProviderRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetBalanceArgs {}

/// Read the wallet balance, memoized briefly so bursts of composed
/// workflows asking at once share one wallet call.
pub struct GetBalance {
    args: GetBalanceArgs,
    wallet: Arc<dyn Wallet>,
    fresh_until: DateTime<Utc>,
}

impl GetBalance {
    const FRESH_FOR_SECS: i64 = 5;

    pub fn new(args: GetBalanceArgs, providers: &ProviderRegistry) -> Result<Self, EngineError> {
        let wallet = providers.wallet()?;
        let fresh_until = providers.clock().now() + chrono::Duration::seconds(Self::FRESH_FOR_SECS);
        Ok(Self {
            args,
            wallet,
            fresh_until,
        })
    }
}

#[async_trait]
impl Task for GetBalance {
    const NAME: &'static str = "paymaster.wallet.balance.v1";

    type Args = GetBalanceArgs;
    type Output = u64;

    fn args(&self) -> &GetBalanceArgs {
        &self.args
    }

    fn expiry(&self) -> Expiry {
        Expiry::Until(self.fresh_until)
    }

    async fn execute(&self, _engine: &Engine) -> Result<u64, TaskError> {
        Ok(self.wallet.balance_msat().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestHarness;

    #[tokio::test]
    async fn balance_queries_within_the_ttl_share_one_wallet_call() {
        let harness = TestHarness::new();
        let engine = harness.engine();

        let first = engine
            .run(&GetBalance::new(GetBalanceArgs {}, engine.providers()).unwrap())
            .await
            .unwrap();
        let second = engine
            .run(&GetBalance::new(GetBalanceArgs {}, engine.providers()).unwrap())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(harness.wallet.balance_calls(), 1);
    }
}
