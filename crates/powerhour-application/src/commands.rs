//! Channel command parsing.

use chrono::NaiveDate;

/// A command typed in a channel, e.g. `start 30` or `summary 2024-03-04`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a session; `None` uses the configured default duration
    Start { minutes: Option<u32> },
    Stop,
    Leaderboard,
    /// Daily digest; `None` means today
    Summary { date: Option<NaiveDate> },
    Usage,
}

impl Command {
    /// Parses command text. Anything unrecognised, including a bad argument,
    /// maps to [`Command::Usage`].
    pub fn parse(text: &str) -> Self {
        let mut words = text.split_whitespace();
        let Some(action) = words.next() else {
            return Command::Usage;
        };
        let arg = words.next();
        if words.next().is_some() {
            return Command::Usage;
        }

        match (action.to_ascii_lowercase().as_str(), arg) {
            ("start", None) => Command::Start { minutes: None },
            ("start", Some(raw)) => match raw.parse::<u32>() {
                Ok(minutes) => Command::Start {
                    minutes: Some(minutes),
                },
                Err(_) => Command::Usage,
            },
            ("stop", None) => Command::Stop,
            ("leaderboard", None) => Command::Leaderboard,
            ("summary", None) => Command::Summary { date: None },
            ("summary", Some(raw)) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Command::Summary { date: Some(date) },
                Err(_) => Command::Usage,
            },
            _ => Command::Usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("start"), Command::Start { minutes: None });
        assert_eq!(
            Command::parse("  START 30 "),
            Command::Start { minutes: Some(30) }
        );
        assert_eq!(Command::parse("stop"), Command::Stop);
        assert_eq!(Command::parse("leaderboard"), Command::Leaderboard);
        assert_eq!(Command::parse("summary"), Command::Summary { date: None });
        assert_eq!(
            Command::parse("summary 2024-03-04"),
            Command::Summary {
                date: NaiveDate::from_ymd_opt(2024, 3, 4)
            }
        );
    }

    #[test]
    fn test_unknown_or_bad_arguments_give_usage() {
        for text in ["", "dance", "start soon", "start -5", "stop now", "summary yesterday"] {
            assert_eq!(Command::parse(text), Command::Usage, "{text:?}");
        }
    }

    #[test]
    fn test_zero_minutes_parses_for_later_rejection() {
        assert_eq!(Command::parse("start 0"), Command::Start { minutes: Some(0) });
    }
}
