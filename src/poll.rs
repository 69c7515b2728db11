use crate::{
    client::{JobClient, Transport},
    config,
    error::JobError,
};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PollingScheduler {
    pub max_attempts: u32,
    pub interval: Duration,
    pub done_status: String,
}

impl Default for PollingScheduler {
    fn default() -> Self {
        Self::from_config(&config::Polling::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub attempts: u32,
    pub status: String,
}

impl PollingScheduler {
    pub fn from_config(cfg: &config::Polling) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            interval: Duration::from_millis(cfg.interval_ms.max(1)),
            done_status: cfg.done_status.clone(),
        }
    }

    /// Polls `guid` once per interval until the done status is seen, the
    /// attempt budget runs out, a poll fails, or `cancel` fires.
    ///
    /// The first poll happens one interval after the call. `on_progress` sees
    /// every successful poll as `(status, attempt)`.
    pub async fn run<T, F>(
        &self,
        client: &JobClient<T>,
        guid: &str,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<PollOutcome, JobError>
    where
        T: Transport,
        F: FnMut(&str, u32),
    {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempt: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(%guid, attempt, "polling cancelled");
                    return Err(JobError::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                polled = client.poll_once(guid) => polled,
            };
            let status = match polled {
                Ok(s) => s.status,
                Err(err) => {
                    warn!(%guid, attempt, "status check failed: {err}");
                    return Err(err);
                }
            };
            on_progress(&status, attempt);

            if status == self.done_status {
                return Ok(PollOutcome {
                    attempts: attempt,
                    status,
                });
            }
            if attempt >= self.max_attempts {
                return Err(JobError::Timeout { attempts: attempt });
            }
        }
    }
}
