//! Waits for a submitted import job to reach a terminal state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::automation::AutomationService;
use crate::error::SyncError;
use crate::types::{ImportJob, TerminalState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How often to poll, and for how long at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` waits until the job is terminal, however long that takes.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Shared flag used to stop an in-progress wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pause between polls.
pub trait Sleeper {
    /// Sleep for `duration`, returning early if `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken);
}

/// Sleeps on the current thread in short slices so cancellation is prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl ThreadSleeper {
    const SLICE: Duration = Duration::from_millis(100);
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) {
        let mut remaining = duration;
        while !remaining.is_zero() && !cancel.is_cancelled() {
            let step = remaining.min(Self::SLICE);
            std::thread::sleep(step);
            remaining -= step;
        }
    }
}

pub struct JobPoller<'a> {
    service: &'a dyn AutomationService,
    sleeper: &'a dyn Sleeper,
    policy: PollPolicy,
}

impl<'a> JobPoller<'a> {
    pub fn new(
        service: &'a dyn AutomationService,
        sleeper: &'a dyn Sleeper,
        policy: PollPolicy,
    ) -> Self {
        Self {
            service,
            sleeper,
            policy,
        }
    }

    /// Block until `job` is `Succeeded` or `Failed`.
    ///
    /// The timeout counts time spent sleeping between polls.
    pub fn await_completion(
        &self,
        job: &ImportJob,
        cancel: &CancelToken,
    ) -> Result<TerminalState, SyncError> {
        let mut waited = Duration::ZERO;
        let mut polls = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled {
                    module: job.module_name.clone(),
                    account: job.account.name.clone(),
                });
            }

            let state = self
                .service
                .get_job_status(job)
                .map_err(|source| SyncError::Service {
                    operation: format!(
                        "checking import status of module '{}' in account '{}'",
                        job.module_name, job.account.name
                    ),
                    source,
                })?;
            polls += 1;
            debug!(module = %job.module_name, account = %job.account.name, ?state, polls, "Polled import job");

            if let Some(terminal) = state.terminal() {
                info!(
                    module = %job.module_name,
                    account = %job.account.name,
                    state = %terminal,
                    polls,
                    "Import job finished"
                );
                return Ok(terminal);
            }

            if let Some(limit) = self.policy.timeout
                && waited >= limit
            {
                return Err(SyncError::PollTimeout {
                    module: job.module_name.clone(),
                    account: job.account.name.clone(),
                    waited,
                });
            }

            self.sleeper.sleep(self.policy.interval, cancel);
            waited += self.policy.interval;
        }
    }
}
