//! Reply delivery step.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::engine::{Engine, Task};
use crate::error::{EngineError, TaskError};
use crate::ports::{ProtocolClient, Reply};
use crate::providers::ProviderRegistry;

use super::connectivity::{WaitForRelaysArgs, WaitForRelaysConnected};

/// Deliver a reply to the protocol peer, waiting for relay connectivity
/// first.
///
/// Cached forever, keyed by the full reply: when a crashed process's queue
/// record is re-dispatched, the cached entry short-circuits a duplicate
/// send.
pub struct SendResponse {
    args: Reply,
    protocol: Arc<dyn ProtocolClient>,
}

impl SendResponse {
    pub fn new(args: Reply, providers: &ProviderRegistry) -> Result<Self, EngineError> {
        Ok(Self {
            protocol: providers.protocol()?,
            args,
        })
    }
}

#[async_trait]
impl Task for SendResponse {
    const NAME: &'static str = "paymaster.response.send.v1";

    type Args = Reply;
    type Output = ();

    fn args(&self) -> &Reply {
        &self.args
    }

    async fn execute(&self, engine: &Engine) -> Result<(), TaskError> {
        let wait = WaitForRelaysConnected::new(WaitForRelaysArgs {}, engine.providers())?;
        engine.run(&wait).await?;

        self.protocol.send_reply(&self.args).await?;
        debug!(request = %self.args.request_id, "reply delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ReplyBody;
    use crate::testutil::TestHarness;

    #[tokio::test]
    async fn an_identical_reply_is_delivered_once() {
        let harness = TestHarness::new();
        let engine = harness.engine();

        let reply = Reply {
            request_id: "req-1".to_string(),
            body: ReplyBody::AuthAck,
        };

        let send = SendResponse::new(reply.clone(), engine.providers()).unwrap();
        engine.run(&send).await.unwrap();

        // Same reply again (e.g. a re-dispatched record): cache hit, no
        // second delivery.
        let send = SendResponse::new(reply.clone(), engine.providers()).unwrap();
        engine.run(&send).await.unwrap();

        assert_eq!(harness.protocol.sent(), vec![reply]);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_when_relays_never_come_up() {
        let harness = TestHarness::new();
        harness.relays.never_connect();
        let engine = harness.engine();

        let send = SendResponse::new(
            Reply {
                request_id: "req-1".to_string(),
                body: ReplyBody::AuthAck,
            },
            engine.providers(),
        )
        .unwrap();

        let err = engine.run(&send).await.unwrap_err();
        assert!(matches!(err, TaskError::RelaysUnavailable { .. }));
        assert!(harness.protocol.sent().is_empty());
    }
}
