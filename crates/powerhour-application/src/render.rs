//! Chat text for every message the engine sends.
//!
//! Output uses Slack-style mrkdwn (`*bold*`, `_italic_`, `>` quotes), which
//! other chat sinks render as plain text without losing meaning.

use chrono::{DateTime, Utc};
use powerhour_core::activity::ActivityKind;
use powerhour_core::commentary::Notice;
use powerhour_core::digest::DailyDigest;
use powerhour_core::scoring::{self, CONNECTION_POINTS, CONVERSATION_POINTS, DEMO_POINTS, LeaderboardEntry};
use std::fmt::Write;

pub const USAGE: &str =
    "Usage: `start [minutes]`, `stop`, `leaderboard` or `summary [YYYY-MM-DD]`";
pub const WAITING_FOR_ACTIVITY: &str = "> _Waiting for activity..._";
pub const SESSION_COMPLETE: &str = "🏁 *Power Hour Complete!* Generating final results...";

/// 1st, 2nd, 3rd, 4th ... 11th, 12th, 13th ... 21st.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn medal(index: usize) -> String {
    match index {
        0 => "🥇".to_string(),
        1 => "🥈".to_string(),
        2 => "🥉".to_string(),
        n => format!("   {}.", n + 1),
    }
}

fn points(n: u32) -> &'static str {
    if n == 1 { "point" } else { "points" }
}

fn counted(n: u32) -> String {
    format!("{n} {}", points(n))
}

fn standings(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return WAITING_FOR_ACTIVITY.to_string();
    }
    let mut out = String::new();
    for (index, rep) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "> {} *{}* - {} pts _({} dials, {} connections, {} conversations, {} demos)_",
            medal(index),
            rep.name,
            rep.score,
            rep.dials,
            rep.connections,
            rep.conversations,
            rep.demos
        );
    }
    out.trim_end().to_string()
}

/// Opening message; it is later edited in place into the live leaderboard.
pub fn start_banner(started_at: DateTime<Utc>, duration_minutes: u32) -> String {
    format!(
        "⚡ *POWER HOUR STARTED for {}!* ⚡\n\
         Tracking activity for the next {} minutes...\n\n\
         >*Scoring Rules:*\n\
         > • *{}* per Demo Booked\n\
         > • *{}* per Conversation (2+ mins)\n\
         > • *{}* per Connection\n\n\
         📊 *LIVE LEADERBOARD*\n{}",
        started_at.format("%A, %B %-d"),
        duration_minutes,
        counted(DEMO_POINTS),
        counted(CONVERSATION_POINTS),
        counted(CONNECTION_POINTS),
        WAITING_FOR_ACTIVITY
    )
}

pub fn live_leaderboard(entries: &[LeaderboardEntry], updated_at: DateTime<Utc>) -> String {
    format!(
        "📊 *LIVE LEADERBOARD* 📊\n\n{}\n> \n> _Updated: {} UTC_",
        standings(entries),
        updated_at.format("%H:%M:%S")
    )
}

pub fn final_leaderboard(entries: &[LeaderboardEntry]) -> String {
    format!("📊 *FINAL LEADERBOARD* 📊\n\n{}", standings(entries))
}

/// Reply for the read-only `leaderboard` command.
pub fn current_leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "Here is the current leaderboard:\n> _No activity yet..._".to_string();
    }
    format!("Here is the current leaderboard:\n{}", standings(entries))
}

pub fn notice(notice: &Notice) -> String {
    match notice {
        Notice::Dial { actor, count } => {
            format!("🤙 *{actor}* is making their *{} call* of the hour!", ordinal(*count))
        }
        Notice::DemoBooked { actor, deal_name } => {
            format!("🔥 *{actor}* just booked a demo with *{deal_name}*! 🎯")
        }
        Notice::FirstOnBoard { actor } => format!("🚀 *{actor}* is the first on the board!"),
        Notice::NewLeader { actor, previous } => {
            format!("🏆 *{actor}* has just taken the lead from {previous}!")
        }
        Notice::HotStreak {
            actor,
            kind,
            count,
            window_minutes,
        } => {
            let what = match kind {
                ActivityKind::Demo => "demos",
                ActivityKind::Conversation => "conversations",
                ActivityKind::Connection => "connections",
                ActivityKind::Dial => "dials",
            };
            format!("🔥🔥 *{actor}* is on a hot streak: {count} {what} in {window_minutes} minutes!")
        }
        Notice::TeamGoal { demos, reward } => {
            format!("🎉 *TEAM GOAL REACHED!* {demos} demos booked. *{reward}* is on us!")
        }
        Notice::Inactive {
            actor,
            idle_minutes,
        } => format!("👀 *{actor}*, no activity for {idle_minutes} minutes. Time to pick up the phone!"),
    }
}

pub fn halfway(elapsed_minutes: i64, remaining_minutes: i64, entries: &[LeaderboardEntry]) -> String {
    format!(
        "⏱️ *HALFWAY THERE!* {elapsed_minutes} minutes down, {remaining_minutes} to go.\n\n{}",
        standings(entries)
    )
}

/// Final-push alert. A gap at or below `close_race_gap` is framed as a
/// close race.
pub fn final_push(remaining_minutes: i64, entries: &[LeaderboardEntry], close_race_gap: u32) -> String {
    let mut out = format!("⏰ *{remaining_minutes} MINUTES LEFT!* Final push!\n");
    match (scoring::score_gap(entries), entries) {
        (Some(0), [first, second, ..]) => {
            let _ = writeln!(
                out,
                "🔥 It's a close race! *{}* is tied with *{}*.",
                first.name, second.name
            );
        }
        (Some(gap), [first, second, ..]) if gap <= close_race_gap => {
            let _ = writeln!(
                out,
                "🔥 It's a close race! *{}* leads *{}* by just {gap} {}.",
                first.name,
                second.name,
                points(gap)
            );
        }
        (Some(gap), [first, ..]) => {
            let _ = writeln!(out, "*{}* is ahead by {gap} {}.", first.name, points(gap));
        }
        _ => {}
    }
    out.push('\n');
    out.push_str(&standings(entries));
    out
}

pub fn already_active() -> String {
    "A Power Hour is already running in this channel!".to_string()
}

pub fn no_active_session() -> String {
    "There is no active Power Hour running in this channel.".to_string()
}

pub fn invalid_duration(minutes: u32) -> String {
    format!("A Power Hour needs a duration above zero minutes (got {minutes}).")
}

fn delta(value: i64) -> String {
    match value {
        0 => String::new(),
        v if v > 0 => format!(" 📈 +{v} vs last week"),
        v => format!(" 📉 {v} vs last week"),
    }
}

pub fn digest(digest: &DailyDigest) -> String {
    let comparison = digest.comparison.unwrap_or_default();
    let mut out = format!(
        "📊 *DAILY SALES DIGEST*\n_{}_\n\n",
        digest.date.format("%A, %B %-d, %Y")
    );

    out.push_str("*📈 KEY METRICS*\n");
    let _ = writeln!(
        out,
        "> • Demos Booked: *{}*{}",
        digest.demos_booked,
        delta(comparison.demos_booked)
    );
    let _ = writeln!(
        out,
        "> • Demos Completed: *{}*{}",
        digest.demos_completed,
        delta(comparison.demos_completed)
    );
    let _ = writeln!(out, "> • Total Calls: *{}*{}", digest.calls, delta(comparison.calls));
    let _ = writeln!(out, "> • Time on Phone: *{} mins*", digest.minutes_on_phone);
    let _ = writeln!(out, "> • Conversion Rate: *{:.1}%*\n", digest.conversion_rate);

    let metrics = &digest.metrics;
    if metrics.average_minutes > 0 {
        out.push_str("*💡 INSIGHTS*\n");
        let _ = writeln!(out, "> • Average Call: *{} mins*", metrics.average_minutes);
        if let Some(longest) = &metrics.longest_call {
            let _ = writeln!(
                out,
                "> • Longest Call: *{} mins* by {} with {}",
                longest.minutes, longest.user, longest.contact
            );
        }
        if let Some(hour) = &metrics.most_active_hour {
            let _ = writeln!(
                out,
                "> • Most Active Hour: *{} UTC* ({} calls)",
                hour.label(),
                hour.count
            );
        }
        out.push('\n');
    }

    out.push_str("*🏆 DAILY LEADERBOARD*\n");
    out.push_str(
        "_5 pts per demo completed • 3 pts per demo booked • 2 pts per conversation • 1 pt per connection_\n\n",
    );
    if digest.leaderboard.is_empty() {
        out.push_str("> _No activity today_\n");
    }
    for (index, rep) in digest.leaderboard.iter().enumerate() {
        let _ = writeln!(out, "> {} *{}* - {} pts", medal(index), rep.name, rep.score);
        let _ = writeln!(
            out,
            ">       {} conversations • {} connections • {} demos booked • {} demos completed",
            rep.conversations, rep.connections, rep.demos_booked, rep.demos_completed
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, score: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            name: name.to_string(),
            score,
            connections: score,
            conversations: 0,
            demos: 0,
            dials: score,
        }
    }

    #[test]
    fn test_ordinals() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (111, "111th"),
            (101, "101st"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected);
        }
    }

    #[test]
    fn test_standings_medals() {
        let board = vec![entry("A", 4), entry("B", 3), entry("C", 2), entry("D", 1)];
        let text = final_leaderboard(&board);
        assert!(text.contains("🥇 *A* - 4 pts"));
        assert!(text.contains("🥉 *C*"));
        assert!(text.contains("   4. *D*"));
    }

    #[test]
    fn test_empty_board_waits_for_activity() {
        assert!(final_leaderboard(&[]).contains("Waiting for activity"));
        assert!(current_leaderboard(&[]).contains("No activity yet"));
    }

    #[test]
    fn test_final_push_close_race() {
        let close = final_push(10, &[entry("A", 8), entry("B", 5)], 5);
        assert!(close.contains("close race"));
        assert!(close.contains("by just 3 points"));

        let wide = final_push(10, &[entry("A", 20), entry("B", 5)], 5);
        assert!(!wide.contains("close race"));
        assert!(wide.contains("ahead by 15 points"));

        let solo = final_push(10, &[entry("A", 1)], 5);
        assert!(solo.starts_with("⏰ *10 MINUTES LEFT!*"));
    }

    #[test]
    fn test_final_push_tie() {
        let tied = final_push(10, &[entry("A", 6), entry("B", 6)], 5);
        assert!(tied.contains("*A* is tied with *B*"));
        assert!(!tied.contains("by just"));

        let tight = final_push(10, &[entry("A", 6), entry("B", 6)], 0);
        assert!(tight.contains("is tied with"));
    }

    #[test]
    fn test_dial_notice_uses_ordinal() {
        let text = notice(&Notice::Dial {
            actor: "Alice".to_string(),
            count: 3,
        });
        assert_eq!(text, "🤙 *Alice* is making their *3rd call* of the hour!");
    }

    #[test]
    fn test_digest_deltas() {
        use chrono::NaiveDate;
        use powerhour_core::digest::{CallMetrics, Comparison};

        let digest = DailyDigest {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            demos_booked: 3,
            demos_completed: 1,
            calls: 10,
            minutes_on_phone: 42,
            conversion_rate: 30.0,
            metrics: CallMetrics::default(),
            leaderboard: Vec::new(),
            comparison: Some(Comparison {
                demos_booked: 2,
                demos_completed: 0,
                calls: -4,
            }),
        };
        let text = super::digest(&digest);
        assert!(text.contains("Monday, March 4, 2024"));
        assert!(text.contains("Demos Booked: *3* 📈 +2 vs last week"));
        assert!(text.contains("Demos Completed: *1*\n"));
        assert!(text.contains("Total Calls: *10* 📉 -4 vs last week"));
        assert!(text.contains("Conversion Rate: *30.0%*"));
        assert!(text.contains("No activity today"));
        assert!(!text.contains("INSIGHTS"));
    }
}
