use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;

use chrono::{DateTime, Days, Local, Utc};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::types::FireEvent;

/// Reserved name of the single recurring daily task.
pub const DAILY_TASK_NAME: &str = "daily_picture";

const INTERVAL_HOURS: u32 = 24;

/// Snapshot of the armed schedule, exposed via the health endpoint.
#[derive(Debug, Clone)]
pub struct ScheduleState {
    pub task_name: &'static str,
    pub next_fire: DateTime<Local>,
    pub interval_hours: u32,
}

struct ArmedTask {
    cancel: CancellationToken,
    state: Arc<StdRwLock<ScheduleState>>,
}

/// Owns the one recurring daily task. Constructed once at process start;
/// `schedule` is synchronous, cheap, and safe to call on every start.
pub struct Scheduler {
    hour: u32,
    minute: u32,
    sender: broadcast::Sender<FireEvent>,
    armed: std::sync::Mutex<Option<ArmedTask>>,
}

impl Scheduler {
    pub fn new(hour: u32, minute: u32, sender: broadcast::Sender<FireEvent>) -> Self {
        Self {
            hour,
            minute,
            sender,
            armed: std::sync::Mutex::new(None),
        }
    }

    /// Arm (or re-arm) the daily task. Replace semantics: any previously
    /// armed task under the reserved name is cancelled first, so at most one
    /// exists at any time and repeated calls have no cumulative effect.
    pub fn schedule(&self, reference: DateTime<Local>) {
        let next = next_fire_after(reference, self.hour, self.minute);
        let cancel = CancellationToken::new();
        let state = Arc::new(StdRwLock::new(ScheduleState {
            task_name: DAILY_TASK_NAME,
            next_fire: next,
            interval_hours: INTERVAL_HOURS,
        }));

        let replaced = {
            let mut armed = self.armed.lock().unwrap_or_else(|p| p.into_inner());
            armed.replace(ArmedTask {
                cancel: cancel.clone(),
                state: state.clone(),
            })
        };
        if let Some(old) = replaced {
            old.cancel.cancel();
            info!(task = DAILY_TASK_NAME, "Replaced previously armed task");
        }

        let sender = self.sender.clone();
        let (hour, minute) = (self.hour, self.minute);
        tokio::spawn(async move {
            let mut next = next;
            loop {
                let delay = (next - Local::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                let event = FireEvent {
                    source: DAILY_TASK_NAME.to_string(),
                    fired_at: Utc::now(),
                };
                if sender.send(event).is_err() {
                    warn!(task = DAILY_TASK_NAME, "No receivers active for scheduled fire");
                } else {
                    info!(task = DAILY_TASK_NAME, "Fired daily task");
                }

                // Re-align to the configured wall-clock time rather than
                // adding a raw 24 h, so the fire time never drifts.
                next = next_fire_after(Local::now(), hour, minute);
                if let Ok(mut s) = state.write() {
                    s.next_fire = next;
                }
            }
        });

        info!(
            task = DAILY_TASK_NAME,
            next_fire = %next.to_rfc3339(),
            "Armed daily task"
        );
    }

    /// Current schedule state, if a task is armed.
    pub fn state(&self) -> Option<ScheduleState> {
        let armed = self.armed.lock().unwrap_or_else(|p| p.into_inner());
        armed
            .as_ref()
            .and_then(|t| t.state.read().ok().map(|s| s.clone()))
    }

    /// Whether a task is currently armed under the reserved name.
    pub fn is_armed(&self) -> bool {
        let armed = self.armed.lock().unwrap_or_else(|p| p.into_inner());
        armed.as_ref().is_some_and(|t| !t.cancel.is_cancelled())
    }

    /// Cancel the armed task, if any.
    pub fn cancel(&self) {
        let mut armed = self.armed.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(old) = armed.take() {
            old.cancel.cancel();
            info!(task = DAILY_TASK_NAME, "Cancelled armed task");
        }
    }
}

/// Next occurrence of `hour:minute` local time strictly after `reference`.
/// Walks forward by calendar day, so DST gaps where the wall-clock time does
/// not exist on a given day are skipped rather than mis-resolved.
pub fn next_fire_after(reference: DateTime<Local>, hour: u32, minute: u32) -> DateTime<Local> {
    for offset in 0..3u64 {
        let day = reference.date_naive() + Days::new(offset);
        let candidate = day
            .and_hms_opt(hour, minute, 0)
            .and_then(|naive| naive.and_local_timezone(Local).earliest());
        if let Some(candidate) = candidate {
            if candidate > reference {
                return candidate;
            }
        }
    }
    // Unreachable for any valid hour/minute; fall back to a plain day ahead.
    reference + chrono::Duration::hours(24)
}
