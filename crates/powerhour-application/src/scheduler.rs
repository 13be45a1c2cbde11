//! Per-session scheduled tasks.
//!
//! Every task spawned for a session hangs off that session's [`TaskSet`]
//! token, so stopping the session cancels all of them in one call. A task
//! only races its *wait* against cancellation; once a callback starts it
//! runs to completion, and callbacks re-check the token before producing any
//! side effect.

use futures::future::BoxFuture;
use powerhour_core::config::PowerHourConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};
use tokio_util::sync::CancellationToken;

pub type TaskCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fire every period, first fire one period from now
    Every(Duration),
    /// Fire once after the delay
    After(Duration),
}

/// Handle to one spawned task.
#[derive(Debug)]
pub struct ScheduledTask {
    label: &'static str,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns `callback` on `schedule` under a child of `parent`.
pub fn schedule(
    label: &'static str,
    schedule: Schedule,
    parent: &CancellationToken,
    callback: TaskCallback,
) -> ScheduledTask {
    let token = parent.child_token();
    let task_token = token.clone();

    let handle = tokio::spawn(async move {
        match schedule {
            Schedule::Every(period) => {
                let mut ticker = interval_at(Instant::now() + period, period);
                loop {
                    tokio::select! {
                        biased;
                        _ = task_token.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    tracing::debug!(target: "scheduler", "[AlertScheduler] Tick: {}", label);
                    callback().await;
                }
            }
            Schedule::After(delay) => {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {}
                    _ = sleep(delay) => {
                        tracing::debug!(target: "scheduler", "[AlertScheduler] Firing: {}", label);
                        callback().await;
                    }
                }
            }
        }
        tracing::trace!(target: "scheduler", "[AlertScheduler] Task exited: {}", label);
    });

    ScheduledTask {
        label,
        token,
        handle,
    }
}

/// All tasks of one session, cancelled together.
#[derive(Debug, Default)]
pub struct TaskSet {
    token: CancellationToken,
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Schedules a task owned by this set. Does nothing once the set is
    /// cancelled.
    pub fn spawn(&self, label: &'static str, when: Schedule, callback: TaskCallback) {
        if self.token.is_cancelled() {
            return;
        }
        let task = schedule(label, when, &self.token, callback);
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(task);
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(ScheduledTask::label)
            .collect()
    }

    pub fn cancel_all(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Timings for the tasks armed at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPlan {
    pub refresh_every: Duration,
    pub sweep_every: Duration,
    /// Skipped for a zero-length session
    pub halfway_after: Option<Duration>,
    /// Skipped unless the session is longer than the final-push lead
    pub final_push_after: Option<Duration>,
    pub auto_stop_after: Duration,
}

impl AlertPlan {
    pub fn for_session(duration_minutes: u32, config: &PowerHourConfig) -> Self {
        let minutes = |m: u32| Duration::from_secs(u64::from(m) * 60);
        let halfway_secs = u64::from(duration_minutes) * 30;
        let lead = config.final_push_lead_minutes;

        Self {
            refresh_every: minutes(config.refresh_interval_minutes),
            sweep_every: minutes(config.inactivity.sweep_interval_minutes),
            halfway_after: (halfway_secs > 0).then(|| Duration::from_secs(halfway_secs)),
            final_push_after: (duration_minutes > lead).then(|| minutes(duration_minutes - lead)),
            auto_stop_after: minutes(duration_minutes),
        }
    }

    /// Minutes elapsed and remaining as announced by the halfway alert.
    ///
    /// The alert fires at exactly half the duration; an odd length rounds the
    /// elapsed half up, so 15 minutes reads "8 down, 7 to go".
    pub fn halfway_split(duration_minutes: u32) -> (i64, i64) {
        let total = i64::from(duration_minutes);
        let elapsed = (total + 1) / 2;
        (elapsed, total - elapsed)
    }
}
