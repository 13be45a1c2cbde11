use crate::activity::ActivityKind;
use crate::config::StreakRule;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of (kind, timestamp) pairs kept for streak detection.
pub const RECENT_CAPACITY: usize = 64;

/// Only demos and conversations have streak rules; dials and connections
/// never enter the window.
fn tracks_streak(kind: ActivityKind) -> bool {
    matches!(kind, ActivityKind::Demo | ActivityKind::Conversation)
}

/// Per-rep counters inside one session.
///
/// Counters only ever go up. `dials >= connections` holds after every call to
/// [`RepStats::record`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepStats {
    connections: u32,
    conversations: u32,
    demos: u32,
    dials: u32,
    last_activity: Option<DateTime<Utc>>,
    #[serde(skip)]
    recent: VecDeque<(ActivityKind, DateTime<Utc>)>,
}

impl RepStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connections(&self) -> u32 {
        self.connections
    }

    pub fn conversations(&self) -> u32 {
        self.conversations
    }

    pub fn demos(&self) -> u32 {
        self.demos
    }

    pub fn dials(&self) -> u32 {
        self.dials
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }

    pub fn has_activity(&self) -> bool {
        self.dials + self.connections + self.conversations + self.demos > 0
    }

    /// Number of windowed entries currently held.
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Applies one activity.
    ///
    /// A connection also raises `dials` to at least `connections`, so an
    /// answered call whose `call.created` was lost still counts as a dial.
    pub fn record(&mut self, kind: ActivityKind, at: DateTime<Utc>) {
        match kind {
            ActivityKind::Dial => self.dials += 1,
            ActivityKind::Connection => {
                self.connections += 1;
                self.dials = self.dials.max(self.connections);
            }
            ActivityKind::Conversation => self.conversations += 1,
            ActivityKind::Demo => self.demos += 1,
        }

        self.last_activity = Some(self.last_activity.map_or(at, |last| last.max(at)));

        if !tracks_streak(kind) {
            return;
        }
        if self.recent.len() == RECENT_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back((kind, at));
    }

    /// Checks the trailing window for a streak of `kind`.
    ///
    /// The window ends at `now` or at the newest recorded entry of `kind`,
    /// whichever is later, so a late out-of-order event still sees the
    /// entries recorded before it arrived. When the rule is met the matched
    /// entries are purged, so the same activities can never trigger a second
    /// notice. Returns the number of activities that made the streak.
    pub fn take_streak(&mut self, kind: ActivityKind, rule: StreakRule, now: DateTime<Utc>) -> Option<usize> {
        let window_end = self
            .recent
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, at)| *at)
            .fold(now, |latest, at| latest.max(at));
        let window_start = window_end - Duration::minutes(i64::from(rule.window_minutes));
        let in_window = |&(k, at): &(ActivityKind, DateTime<Utc>)| k == kind && at >= window_start;

        let matched = self.recent.iter().filter(|entry| in_window(*entry)).count();
        if matched < rule.threshold {
            return None;
        }

        self.recent.retain(|entry| !in_window(entry));
        Some(matched)
    }

    /// Minutes since the last activity when the rep has dialled at least once
    /// and has been quiet for `threshold_minutes` or longer.
    pub fn idle_minutes(&self, now: DateTime<Utc>, threshold_minutes: u32) -> Option<i64> {
        if self.dials == 0 {
            return None;
        }
        let last = self.last_activity?;
        let idle = (now - last).num_minutes();
        (idle >= i64::from(threshold_minutes)).then_some(idle)
    }

    /// Restarts the inactivity clock after a notice went out.
    pub fn mark_nudged(&mut self, now: DateTime<Utc>) {
        self.last_activity = Some(self.last_activity.map_or(now, |last| last.max(now)));
    }
}
