//! Leaderboard scoring.
//!
//! Pure functions: nothing here mutates session state, so they can be called
//! from event application, the periodic refresh and the read-only
//! `leaderboard` command alike.

use crate::session::RepStats;
use serde::{Deserialize, Serialize};

pub const CONNECTION_POINTS: u32 = 1;
pub const CONVERSATION_POINTS: u32 = 2;
pub const DEMO_POINTS: u32 = 5;

/// One row of a leaderboard, with the counters it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub connections: u32,
    pub conversations: u32,
    pub demos: u32,
    pub dials: u32,
}

/// Points for a rep: connections x1 + conversations x2 + demos x5.
pub fn score(stats: &RepStats) -> u32 {
    stats.connections() * CONNECTION_POINTS
        + stats.conversations() * CONVERSATION_POINTS
        + stats.demos() * DEMO_POINTS
}

/// Builds the leaderboard for every rep with at least one recorded activity.
///
/// Sorted by score descending; equal scores are ordered by name ascending so
/// the output does not depend on map iteration order.
pub fn leaderboard<'a, I>(rep_stats: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = (&'a String, &'a RepStats)>,
{
    let mut board: Vec<LeaderboardEntry> = rep_stats
        .into_iter()
        .filter(|(_, stats)| stats.has_activity())
        .map(|(name, stats)| LeaderboardEntry {
            name: name.clone(),
            score: score(stats),
            connections: stats.connections(),
            conversations: stats.conversations(),
            demos: stats.demos(),
            dials: stats.dials(),
        })
        .collect();

    board.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    board
}

/// Points between first and second place, if there are two places.
pub fn score_gap(board: &[LeaderboardEntry]) -> Option<u32> {
    match board {
        [first, second, ..] => Some(first.score - second.score),
        _ => None,
    }
}

/// Demos booked per call as a percentage, rounded to one decimal.
///
/// Returns 0.0 when there were no calls.
pub fn conversion_rate(demos_booked: usize, total_calls: usize) -> f64 {
    if total_calls == 0 {
        return 0.0;
    }
    let rate = demos_booked as f64 / total_calls as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}
