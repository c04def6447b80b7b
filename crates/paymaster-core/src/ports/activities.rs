//! Activity store port: durable per-request outcome records.

use async_trait::async_trait;

use crate::domain::Activity;
use crate::error::ProviderError;

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn record(&self, activity: &Activity) -> Result<(), ProviderError>;

    /// The idempotency lookup: has this request already been handled?
    async fn find_by_request(&self, request_id: &str) -> Result<Option<Activity>, ProviderError>;
}
