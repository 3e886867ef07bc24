use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::enrich::enrich;
use crate::traits::{Notifier, PictureSource};

/// Lifecycle of one scheduled cycle:
/// `Idle → Running → {Succeeded, Retrying, FailedPermanently}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Retrying,
    FailedPermanently,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Succeeded => write!(f, "succeeded"),
            RunState::Retrying => write!(f, "retrying"),
            RunState::FailedPermanently => write!(f, "failed_permanently"),
        }
    }
}

enum CycleError {
    /// Transient: fetch failures of any kind, or push transport trouble.
    /// Carries the server-requested retry interval when one was given.
    Retryable {
        message: String,
        retry_after_secs: Option<u64>,
    },
    /// Notification permission denied. Logged and dropped, never retried.
    Dropped(String),
}

/// Runs the daily fetch → enrich → notify pipeline with an explicit
/// exponential backoff: base 30 s (or the server's Retry-After when given)
/// doubling per attempt, capped at 30 min, at most `MAX_ATTEMPTS` attempts
/// per cycle. Exhaustion ends the cycle; the next scheduler fire starts a
/// fresh one.
pub struct Worker {
    source: Arc<dyn PictureSource>,
    notifier: Arc<dyn Notifier>,
    state: StdRwLock<RunState>,
}

impl Worker {
    pub const MAX_ATTEMPTS: u32 = 5;
    const RETRY_BASE_DELAY_SECS: u64 = 30;
    const RETRY_MAX_DELAY_SECS: u64 = 30 * 60;

    pub fn new(source: Arc<dyn PictureSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            source,
            notifier,
            state: StdRwLock::new(RunState::Idle),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, state: RunState) {
        *self.state.write().unwrap_or_else(|p| p.into_inner()) = state;
    }

    /// Execute one scheduled cycle. Never panics and never propagates an
    /// error past the task boundary; the terminal state is the outcome.
    pub async fn run_cycle(&self) -> RunState {
        self.set_state(RunState::Running);

        let mut attempt: u32 = 0;
        loop {
            match self.attempt_once().await {
                Ok(()) => {
                    self.set_state(RunState::Succeeded);
                    info!(attempts = attempt + 1, "Daily cycle succeeded");
                    return RunState::Succeeded;
                }
                Err(CycleError::Dropped(message)) => {
                    warn!("Notification dropped: {}", message);
                    self.set_state(RunState::FailedPermanently);
                    return RunState::FailedPermanently;
                }
                Err(CycleError::Retryable {
                    message,
                    retry_after_secs,
                }) => {
                    attempt += 1;
                    if attempt >= Self::MAX_ATTEMPTS {
                        error!(
                            attempts = attempt,
                            "Daily cycle failed permanently: {}",
                            message
                        );
                        self.set_state(RunState::FailedPermanently);
                        return RunState::FailedPermanently;
                    }
                    // The cap never cuts below a server-requested interval.
                    let base = retry_after_secs.unwrap_or(Self::RETRY_BASE_DELAY_SECS);
                    let wait = base
                        .saturating_mul(2u64.pow(attempt - 1))
                        .min(Self::RETRY_MAX_DELAY_SECS.max(base));
                    warn!(
                        wait_secs = wait,
                        attempt = attempt,
                        max = Self::MAX_ATTEMPTS,
                        "Cycle attempt failed, retrying: {}",
                        message
                    );
                    self.set_state(RunState::Retrying);
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                    self.set_state(RunState::Running);
                }
            }
        }
    }

    async fn attempt_once(&self) -> Result<(), CycleError> {
        let record = self.source.fetch(None).await.map_err(|e| CycleError::Retryable {
            retry_after_secs: e.retry_after_secs,
            message: e.to_string(),
        })?;

        let enriched = enrich(record);

        match self.notifier.show(&enriched).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_permission_denied() => Err(CycleError::Dropped(e.to_string())),
            Err(e) => Err(CycleError::Retryable {
                message: e.to_string(),
                retry_after_secs: None,
            }),
        }
    }
}
