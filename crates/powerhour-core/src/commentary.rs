//! Narrative notices derived from session state.
//!
//! Every function here compares "now" against what was already announced and
//! only speaks when something new happened: lead changes are a diff against
//! the previous leaderboard, streaks purge the activities they used, and the
//! team goal flips a one-way flag.

use crate::activity::ActivityKind;
use crate::config::{StreakRule, TeamGoalConfig};
use crate::scoring::LeaderboardEntry;
use crate::session::RepStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something worth posting to the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A rep placed another call
    Dial { actor: String, count: u32 },
    /// A rep booked a demo
    DemoBooked { actor: String, deal_name: String },
    /// First score of the session
    FirstOnBoard { actor: String },
    /// The top spot changed hands
    NewLeader { actor: String, previous: String },
    HotStreak {
        actor: String,
        kind: ActivityKind,
        count: usize,
        window_minutes: u32,
    },
    TeamGoal { demos: u32, reward: String },
    /// A rep has been quiet for too long
    Inactive { actor: String, idle_minutes: i64 },
}

impl Notice {
    /// Notices that celebrate a booked demo get a GIF attached.
    pub fn wants_celebration(&self) -> bool {
        matches!(self, Notice::DemoBooked { .. } | Notice::TeamGoal { .. })
    }
}

/// Compares the top of two leaderboards.
///
/// The very first score yields `FirstOnBoard` and nothing else; afterwards a
/// different name in first place yields `NewLeader`.
pub fn lead_change(current: &[LeaderboardEntry], previous: &[LeaderboardEntry]) -> Option<Notice> {
    let leader = current.first()?;

    match previous.first() {
        None => Some(Notice::FirstOnBoard {
            actor: leader.name.clone(),
        }),
        Some(prev) if prev.name != leader.name => Some(Notice::NewLeader {
            actor: leader.name.clone(),
            previous: prev.name.clone(),
        }),
        Some(_) => None,
    }
}

/// Streak check for the rep that just logged `kind` at `at`.
pub fn hot_streak(
    actor: &str,
    stats: &mut RepStats,
    kind: ActivityKind,
    rule: StreakRule,
    at: DateTime<Utc>,
) -> Option<Notice> {
    let count = stats.take_streak(kind, rule, at)?;
    Some(Notice::HotStreak {
        actor: actor.to_string(),
        kind,
        count,
        window_minutes: rule.window_minutes,
    })
}

/// Fires once, the first time `team_demos` reaches the configured threshold.
///
/// Without a reward there is nothing to announce and the flag stays down.
pub fn team_goal(team_demos: u32, announced: &mut bool, goal: &TeamGoalConfig) -> Option<Notice> {
    if *announced || team_demos < goal.demo_threshold {
        return None;
    }
    let reward = goal.reward.as_ref()?;
    *announced = true;
    Some(Notice::TeamGoal {
        demos: team_demos,
        reward: reward.clone(),
    })
}
