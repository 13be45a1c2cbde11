//! End-of-day sales digest.
//!
//! Unlike a session leaderboard, the digest is computed from historical
//! records fetched through [`DigestSource`](crate::ports::DigestSource) and
//! scores completed demos separately from booked ones.

use crate::scoring::conversion_rate;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DIGEST_DEMO_COMPLETED_POINTS: u32 = 5;
pub const DIGEST_DEMO_BOOKED_POINTS: u32 = 3;
pub const DIGEST_CONVERSATION_POINTS: u32 = 2;
pub const DIGEST_CONNECTION_POINTS: u32 = 1;

/// A deal as returned by a CRM search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRecord {
    pub id: String,
    pub name: Option<String>,
    pub owner_id: Option<String>,
}

/// An answered call as returned by the telephony history API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub user: Option<String>,
    pub duration_secs: u64,
    pub started_at: DateTime<Utc>,
    /// Company, contact name or raw number, whichever the source had
    pub contact: Option<String>,
}

/// Everything fetched for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayActivity {
    pub demos_booked: Vec<DealRecord>,
    pub demos_completed: Vec<DealRecord>,
    pub calls: Vec<CallRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongestCall {
    pub minutes: u64,
    pub user: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveHour {
    /// UTC hour of day, 0..=23
    pub hour: u32,
    pub count: usize,
}

impl ActiveHour {
    /// 12-hour clock label such as `9AM` or `12PM`.
    pub fn label(&self) -> String {
        let period = if self.hour >= 12 { "PM" } else { "AM" };
        let display = match self.hour {
            0 => 12,
            h if h > 12 => h - 12,
            h => h,
        };
        format!("{display}{period}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMetrics {
    pub total_calls: usize,
    pub total_minutes: u64,
    pub average_minutes: u64,
    pub longest_call: Option<LongestCall>,
    pub most_active_hour: Option<ActiveHour>,
}

fn rounded_minutes(seconds: f64) -> u64 {
    (seconds / 60.0).round() as u64
}

/// Totals, averages and peaks over a day's answered calls.
///
/// Ties for the longest call keep the earliest record; ties for the busiest
/// hour keep the earliest hour.
pub fn analyze_call_metrics(calls: &[CallRecord]) -> CallMetrics {
    if calls.is_empty() {
        return CallMetrics::default();
    }

    let total_seconds: u64 = calls.iter().map(|c| c.duration_secs).sum();

    let longest_call = calls
        .iter()
        .filter(|call| call.duration_secs > 0)
        .fold(None::<&CallRecord>, |longest, call| match longest {
            Some(best) if best.duration_secs >= call.duration_secs => Some(best),
            _ => Some(call),
        })
        .map(|call| LongestCall {
            minutes: rounded_minutes(call.duration_secs as f64),
            user: call.user.clone().unwrap_or_else(|| "Unknown".to_string()),
            contact: call.contact.clone().unwrap_or_else(|| "Unknown".to_string()),
        });

    let mut per_hour: BTreeMap<u32, usize> = BTreeMap::new();
    for call in calls {
        *per_hour.entry(call.started_at.hour()).or_default() += 1;
    }
    let most_active_hour = per_hour
        .into_iter()
        .fold(None::<ActiveHour>, |best, (hour, count)| match best {
            Some(b) if b.count >= count => Some(b),
            _ => Some(ActiveHour { hour, count }),
        });

    CallMetrics {
        total_calls: calls.len(),
        total_minutes: rounded_minutes(total_seconds as f64),
        average_minutes: rounded_minutes(total_seconds as f64 / calls.len() as f64),
        longest_call,
        most_active_hour,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub demos_booked: u32,
    pub demos_completed: u32,
    pub conversations: u32,
    pub connections: u32,
}

fn owner_display(owner_id: Option<&str>, owners: &HashMap<String, String>) -> String {
    match owner_id {
        Some(id) => owners
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("Owner {id}")),
        None => "Unassigned".to_string(),
    }
}

/// Daily leaderboard: 5 per demo completed, 3 per demo booked, 2 per
/// conversation, 1 per shorter answered call.
///
/// `owners` maps CRM owner ids to names; unknown ids are shown as
/// `Owner <id>`.
pub fn build_daily_leaderboard(
    day: &DayActivity,
    owners: &HashMap<String, String>,
    conversation_min_seconds: u64,
) -> Vec<DailyLeaderboardEntry> {
    let mut reps: HashMap<String, DailyLeaderboardEntry> = HashMap::new();

    for deal in &day.demos_booked {
        let name = owner_display(deal.owner_id.as_deref(), owners);
        rep_entry(&mut reps, name).demos_booked += 1;
    }
    for deal in &day.demos_completed {
        let name = owner_display(deal.owner_id.as_deref(), owners);
        rep_entry(&mut reps, name).demos_completed += 1;
    }
    for call in &day.calls {
        let name = call.user.clone().unwrap_or_else(|| "Unknown".to_string());
        let rep = rep_entry(&mut reps, name);
        if call.duration_secs >= conversation_min_seconds {
            rep.conversations += 1;
        } else {
            rep.connections += 1;
        }
    }

    let mut board: Vec<DailyLeaderboardEntry> = reps
        .into_values()
        .map(|mut rep| {
            rep.score = rep.demos_completed * DIGEST_DEMO_COMPLETED_POINTS
                + rep.demos_booked * DIGEST_DEMO_BOOKED_POINTS
                + rep.conversations * DIGEST_CONVERSATION_POINTS
                + rep.connections * DIGEST_CONNECTION_POINTS;
            rep
        })
        .collect();
    board.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    board
}

fn rep_entry(reps: &mut HashMap<String, DailyLeaderboardEntry>, name: String) -> &mut DailyLeaderboardEntry {
    reps.entry(name.clone())
        .or_insert_with(|| DailyLeaderboardEntry {
            name,
            ..Default::default()
        })
}

/// Day-over-week deltas (today minus the same weekday last week).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub demos_booked: i64,
    pub demos_completed: i64,
    pub calls: i64,
}

impl Comparison {
    pub fn between(today: &DayActivity, last_week: &DayActivity) -> Self {
        let delta = |a: usize, b: usize| a as i64 - b as i64;
        Self {
            demos_booked: delta(today.demos_booked.len(), last_week.demos_booked.len()),
            demos_completed: delta(today.demos_completed.len(), last_week.demos_completed.len()),
            calls: delta(today.calls.len(), last_week.calls.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDigest {
    pub date: NaiveDate,
    pub demos_booked: usize,
    pub demos_completed: usize,
    pub calls: usize,
    pub minutes_on_phone: u64,
    /// Demos booked per answered call, percent
    pub conversion_rate: f64,
    pub metrics: CallMetrics,
    pub leaderboard: Vec<DailyLeaderboardEntry>,
    pub comparison: Option<Comparison>,
}

pub fn build_digest(
    date: NaiveDate,
    today: &DayActivity,
    last_week: Option<&DayActivity>,
    owners: &HashMap<String, String>,
    conversation_min_seconds: u64,
) -> DailyDigest {
    let metrics = analyze_call_metrics(&today.calls);
    DailyDigest {
        date,
        demos_booked: today.demos_booked.len(),
        demos_completed: today.demos_completed.len(),
        calls: today.calls.len(),
        minutes_on_phone: metrics.total_minutes,
        conversion_rate: conversion_rate(today.demos_booked.len(), today.calls.len()),
        leaderboard: build_daily_leaderboard(today, owners, conversation_min_seconds),
        comparison: last_week.map(|lw| Comparison::between(today, lw)),
        metrics,
    }
}
