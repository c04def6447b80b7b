//! Relay connectivity tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{Engine, Expiry, Task};
use crate::error::{EngineError, TaskError};
use crate::ports::RelayStatus;
use crate::providers::ProviderRegistry;

/// One connectivity probe.
///
/// Memoized with a ~1 second TTL so many concurrently composed workflows
/// polling at once produce a single provider call per second, not one each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConnectivityArgs {}

pub struct CheckRelayConnectivity {
    args: CheckConnectivityArgs,
    relays: Arc<dyn RelayStatus>,
    fresh_until: DateTime<Utc>,
}

impl CheckRelayConnectivity {
    pub fn new(
        args: CheckConnectivityArgs,
        providers: &ProviderRegistry,
    ) -> Result<Self, EngineError> {
        let relays = providers.relays()?;
        let fresh_until = providers.clock().now() + chrono::Duration::seconds(1);
        Ok(Self {
            args,
            relays,
            fresh_until,
        })
    }
}

#[async_trait]
impl Task for CheckRelayConnectivity {
    const NAME: &'static str = "paymaster.relays.check.v1";

    type Args = CheckConnectivityArgs;
    type Output = bool;

    fn args(&self) -> &CheckConnectivityArgs {
        &self.args
    }

    fn expiry(&self) -> Expiry {
        Expiry::Until(self.fresh_until)
    }

    async fn execute(&self, _engine: &Engine) -> Result<bool, TaskError> {
        Ok(self.relays.is_connected().await)
    }
}

/// Poll states for the bounded connectivity wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Polling { attempt: u32 },
    Connected,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitForRelaysArgs {}

/// Wait until relays are connected, polling once per second with a fixed
/// attempt bound. Exhausting the bound is a failure.
///
/// The result is never reused: whether the process was connected a moment
/// ago says nothing about the next send.
pub struct WaitForRelaysConnected {
    args: WaitForRelaysArgs,
}

impl WaitForRelaysConnected {
    pub const MAX_ATTEMPTS: u32 = 5;
    pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(args: WaitForRelaysArgs, _providers: &ProviderRegistry) -> Result<Self, EngineError> {
        Ok(Self { args })
    }
}

#[async_trait]
impl Task for WaitForRelaysConnected {
    const NAME: &'static str = "paymaster.relays.wait.v1";

    type Args = WaitForRelaysArgs;
    type Output = ();

    fn args(&self) -> &WaitForRelaysArgs {
        &self.args
    }

    fn expiry(&self) -> Expiry {
        Expiry::Skip
    }

    async fn execute(&self, engine: &Engine) -> Result<(), TaskError> {
        let mut state = PollState::Polling { attempt: 1 };
        loop {
            match state {
                PollState::Polling { attempt } => {
                    let probe =
                        CheckRelayConnectivity::new(CheckConnectivityArgs {}, engine.providers())?;
                    if engine.run(&probe).await? {
                        state = PollState::Connected;
                    } else if attempt >= Self::MAX_ATTEMPTS {
                        state = PollState::Exhausted;
                    } else {
                        debug!(attempt, "relays not connected yet, waiting");
                        tokio::time::sleep(Self::POLL_INTERVAL).await;
                        state = PollState::Polling {
                            attempt: attempt + 1,
                        };
                    }
                }
                PollState::Connected => return Ok(()),
                PollState::Exhausted => {
                    return Err(TaskError::RelaysUnavailable {
                        attempts: Self::MAX_ATTEMPTS,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MonotonicTestClock, TestHarness};

    #[tokio::test(start_paused = true)]
    async fn resolves_on_the_poll_that_sees_connectivity() {
        let clock = Arc::new(MonotonicTestClock::start());
        let harness = TestHarness::with_clock(clock);
        harness.relays.connect_after(3);
        let engine = harness.engine();

        let wait = WaitForRelaysConnected::new(WaitForRelaysArgs {}, engine.providers()).unwrap();
        engine.run(&wait).await.unwrap();

        // Connected on the third poll: exactly three provider calls.
        assert_eq!(harness.relays.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_after_exhausting_the_attempt_bound() {
        let clock = Arc::new(MonotonicTestClock::start());
        let harness = TestHarness::with_clock(clock);
        harness.relays.never_connect();
        let engine = harness.engine();

        let wait = WaitForRelaysConnected::new(WaitForRelaysArgs {}, engine.providers()).unwrap();
        let err = engine.run(&wait).await.unwrap_err();

        assert!(matches!(
            err,
            TaskError::RelaysUnavailable { attempts: 5 }
        ));
        assert_eq!(harness.relays.polls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_results_are_shared_within_the_ttl() {
        let clock = Arc::new(MonotonicTestClock::start());
        let harness = TestHarness::with_clock(clock);
        let engine = harness.engine();

        // Back-to-back probes within one second: one provider call.
        let probe =
            CheckRelayConnectivity::new(CheckConnectivityArgs {}, engine.providers()).unwrap();
        assert!(engine.run(&probe).await.unwrap());
        let probe =
            CheckRelayConnectivity::new(CheckConnectivityArgs {}, engine.providers()).unwrap();
        assert!(engine.run(&probe).await.unwrap());

        assert_eq!(harness.relays.polls(), 1);

        // Past the TTL the probe runs again.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let probe =
            CheckRelayConnectivity::new(CheckConnectivityArgs {}, engine.providers()).unwrap();
        assert!(engine.run(&probe).await.unwrap());
        assert_eq!(harness.relays.polls(), 2);
    }
}
