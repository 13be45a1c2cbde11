use serde::{Deserialize, Serialize};

/// Optional allowlist of rep names.
///
/// Matching is case-insensitive and exact (after trimming). An empty roster
/// accepts everybody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    members: Vec<String>,
}

impl Roster {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members
                .into_iter()
                .map(|m| m.into().trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// A roster that accepts every actor.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Returns the roster spelling of `name`, or `None` if it is not allowed.
    ///
    /// With an open roster the trimmed input is returned unchanged.
    pub fn canonical(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if self.is_open() {
            return Some(name.to_string());
        }
        let lowered = name.to_lowercase();
        self.members
            .iter()
            .find(|member| member.to_lowercase() == lowered)
            .cloned()
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.canonical(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_roster_accepts_everybody() {
        let roster = Roster::open();
        assert_eq!(roster.canonical("  Carol "), Some("Carol".to_string()));
        assert!(!roster.accepts("   "));
    }

    #[test]
    fn test_case_insensitive_match_returns_roster_spelling() {
        let roster = Roster::new(["Alice", "Bob"]);
        assert_eq!(roster.canonical("alice"), Some("Alice".to_string()));
        assert_eq!(roster.canonical("BOB"), Some("Bob".to_string()));
        assert_eq!(roster.canonical("Alicia"), None);
    }

    #[test]
    fn test_blank_members_are_ignored() {
        let roster = Roster::new(["", "  "]);
        assert!(roster.is_open());
    }
}
