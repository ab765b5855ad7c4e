use crate::config::PollingConfig;
use crate::error::{CanaryError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Fixed-interval poll loop with an optional attempt bound
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    max_attempts: Option<u32>,
}

impl Poller {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.interval(), config.attempt_limit())
    }

    /// Re-run `check` every interval until `done` accepts its value.
    ///
    /// The first check happens one interval after the call. Check errors end
    /// the wait immediately.
    pub async fn wait_for<T, F, Fut, P>(
        &self,
        canary_name: &str,
        what: &str,
        mut check: F,
        mut done: P,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: FnMut(&T) -> bool,
    {
        let mut attempts = 0u32;

        loop {
            sleep(self.interval).await;
            attempts += 1;

            let current = check().await?;
            if done(&current) {
                debug!(canary_name, attempts, "{} reached", what);
                return Ok(current);
            }

            if let Some(max_attempts) = self.max_attempts {
                if attempts >= max_attempts {
                    return Err(CanaryError::PollTimeout {
                        what: what.to_string(),
                        canary: canary_name.to_string(),
                        attempts,
                    });
                }
            }
        }
    }
}
