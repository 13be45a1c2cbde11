//! Session domain model.
//!
//! A `Session` is the in-memory state of one running Power Hour in one
//! channel. It is plain data plus the rules for applying activity to it; the
//! application layer wraps it in a lock and owns its timers.

use super::rep_stats::RepStats;
use crate::activity::{Activity, ActivityEvent, ActivityKind, Roster};
use crate::commentary::{self, Notice};
use crate::config::{PowerHourConfig, StreakRule, TeamGoalConfig};
use crate::ports::MessageHandle;
use crate::scoring::{self, LeaderboardEntry};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Stopped,
}

/// Which entry point finalized the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    Manual,
    AutoStop,
}

/// The subset of configuration a session is started with.
///
/// Captured at start so a config reload never changes a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRules {
    pub roster: Roster,
    pub demo_streak: StreakRule,
    pub conversation_streak: StreakRule,
    pub team_goal: TeamGoalConfig,
    pub inactivity_threshold_minutes: u32,
    pub announce_dials: bool,
}

impl SessionRules {
    pub fn from_config(config: &PowerHourConfig) -> Self {
        Self {
            roster: Roster::new(config.roster.iter().cloned()),
            demo_streak: config.demo_streak,
            conversation_streak: config.conversation_streak,
            team_goal: config.team_goal.clone(),
            inactivity_threshold_minutes: config.inactivity.threshold_minutes,
            announce_dials: config.announce_dials,
        }
    }

    /// Hot-streak rule for the activity kinds that have one.
    pub fn streak_rule(&self, kind: ActivityKind) -> Option<StreakRule> {
        match kind {
            ActivityKind::Demo => Some(self.demo_streak),
            ActivityKind::Conversation => Some(self.conversation_streak),
            ActivityKind::Dial | ActivityKind::Connection => None,
        }
    }
}

impl Default for SessionRules {
    fn default() -> Self {
        Self::from_config(&PowerHourConfig::default())
    }
}

/// What applying one event to one session produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventOutcome {
    pub notices: Vec<Notice>,
    /// Fresh standings when the event moved the score
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    channel: String,
    started_at: DateTime<Utc>,
    duration_minutes: u32,
    rep_stats: HashMap<String, RepStats>,
    previous_leaderboard: Vec<LeaderboardEntry>,
    team_demos: u32,
    team_goal_announced: bool,
    live_message: Option<MessageHandle>,
    status: SessionStatus,
    rules: SessionRules,
}

impl Session {
    pub fn new(
        channel: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_minutes: u32,
        rules: SessionRules,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            started_at,
            duration_minutes,
            rep_stats: HashMap::new(),
            previous_leaderboard: Vec::new(),
            team_demos: 0,
            team_goal_announced: false,
            live_message: None,
            status: SessionStatus::Running,
            rules,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.started_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_minutes().max(0)
    }

    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.ends_at() - now).num_minutes().max(0)
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn rules(&self) -> &SessionRules {
        &self.rules
    }

    pub fn team_demos(&self) -> u32 {
        self.team_demos
    }

    pub fn team_goal_announced(&self) -> bool {
        self.team_goal_announced
    }

    pub fn rep_stats(&self) -> &HashMap<String, RepStats> {
        &self.rep_stats
    }

    pub fn rep(&self, name: &str) -> Option<&RepStats> {
        self.rep_stats.get(name)
    }

    pub fn live_message(&self) -> Option<&MessageHandle> {
        self.live_message.as_ref()
    }

    pub fn set_live_message(&mut self, handle: MessageHandle) {
        self.live_message = Some(handle);
    }

    /// Current standings without touching the diff snapshot.
    pub fn standings(&self) -> Vec<LeaderboardEntry> {
        scoring::leaderboard(&self.rep_stats)
    }

    /// Applies one activity event.
    ///
    /// Returns `None` when the session is stopped or its roster does not
    /// accept the actor. Otherwise the rep's counters are updated and any
    /// commentary the event triggered is returned; scoring events also
    /// recompute the leaderboard and diff it against the previous one.
    pub fn apply_event(&mut self, event: &ActivityEvent) -> Option<EventOutcome> {
        if !self.is_running() {
            return None;
        }
        let actor = self.rules.roster.canonical(&event.actor)?;
        let kind = event.kind();
        let at = event.occurred_at;

        let stats = self.rep_stats.entry(actor.clone()).or_default();
        stats.record(kind, at);

        let mut outcome = EventOutcome::default();
        match &event.activity {
            Activity::Dial => {
                if self.rules.announce_dials {
                    outcome.notices.push(Notice::Dial {
                        actor: actor.clone(),
                        count: stats.dials(),
                    });
                }
            }
            Activity::Demo { deal_name } => {
                self.team_demos += 1;
                outcome.notices.push(Notice::DemoBooked {
                    actor: actor.clone(),
                    deal_name: deal_name.clone(),
                });
            }
            Activity::Connection | Activity::Conversation { .. } => {}
        }

        if let Some(rule) = self.rules.streak_rule(kind) {
            outcome
                .notices
                .extend(commentary::hot_streak(&actor, stats, kind, rule, at));
        }

        if let Some(notice) = commentary::team_goal(
            self.team_demos,
            &mut self.team_goal_announced,
            &self.rules.team_goal,
        ) {
            outcome.notices.push(notice);
        }

        if kind.is_scoring() {
            let (board, lead) = self.refresh_leaderboard();
            outcome.notices.extend(lead);
            outcome.leaderboard = Some(board);
        }

        Some(outcome)
    }

    /// Recomputes the leaderboard, diffs it against the previous snapshot and
    /// stores it as the new snapshot.
    pub fn refresh_leaderboard(&mut self) -> (Vec<LeaderboardEntry>, Option<Notice>) {
        let current = self.standings();
        let notice = commentary::lead_change(&current, &self.previous_leaderboard);
        self.previous_leaderboard = current.clone();
        (current, notice)
    }

    /// Flags every rep who has dialled but been quiet for the inactivity
    /// threshold, and restarts their clock so they are not flagged again
    /// before another full threshold passes.
    pub fn sweep_inactive(&mut self, now: DateTime<Utc>) -> Vec<Notice> {
        let threshold = self.rules.inactivity_threshold_minutes;
        let mut idle: Vec<(String, i64)> = self
            .rep_stats
            .iter()
            .filter_map(|(name, stats)| {
                stats
                    .idle_minutes(now, threshold)
                    .map(|minutes| (name.clone(), minutes))
            })
            .collect();
        idle.sort_by(|a, b| a.0.cmp(&b.0));

        idle.into_iter()
            .map(|(actor, idle_minutes)| {
                if let Some(stats) = self.rep_stats.get_mut(&actor) {
                    stats.mark_nudged(now);
                }
                Notice::Inactive {
                    actor,
                    idle_minutes,
                }
            })
            .collect()
    }

    /// Marks the session stopped and captures its final state.
    pub fn finish(&mut self, ended_at: DateTime<Utc>, reason: StopReason) -> SessionSnapshot {
        self.status = SessionStatus::Stopped;
        let leaderboard = self.standings();
        let (winner, winner_score) = leaderboard
            .first()
            .map(|e| (Some(e.name.clone()), e.score))
            .unwrap_or((None, 0));

        SessionSnapshot {
            session_id: self.id,
            channel: self.channel.clone(),
            started_at: self.started_at,
            ended_at,
            duration_minutes: self.duration_minutes,
            reason,
            rep_stats: self
                .rep_stats
                .iter()
                .map(|(name, stats)| (name.clone(), stats.clone()))
                .collect(),
            leaderboard,
            team_demos: self.team_demos,
            team_goal_met: self.team_demos >= self.rules.team_goal.demo_threshold,
            winner,
            winner_score,
        }
    }
}

/// Immutable final state of a stopped session, for reporting and archival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub channel: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub reason: StopReason,
    pub rep_stats: BTreeMap<String, RepStats>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub team_demos: u32,
    pub team_goal_met: bool,
    pub winner: Option<String>,
    pub winner_score: u32,
}

/// Flat row handed to the results log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: NaiveDate,
    pub channel: String,
    pub duration_minutes: u32,
    pub total_connections: u32,
    pub total_conversations: u32,
    pub total_demos: u32,
    pub winner: String,
    pub winner_score: u32,
    pub team_goal_met: bool,
}

impl From<&SessionSnapshot> for SessionRecord {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let sum = |f: fn(&RepStats) -> u32| snapshot.rep_stats.values().map(f).sum::<u32>();
        Self {
            date: snapshot.ended_at.date_naive(),
            channel: snapshot.channel.clone(),
            duration_minutes: snapshot.duration_minutes,
            total_connections: sum(RepStats::connections),
            total_conversations: sum(RepStats::conversations),
            total_demos: sum(RepStats::demos),
            winner: snapshot
                .winner
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            winner_score: snapshot.winner_score,
            team_goal_met: snapshot.team_goal_met,
        }
    }
}
