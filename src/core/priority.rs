//! Priority level for research sub-queries.
//!
//! Sub-queries proposed by the model carry a priority; the research
//! runtime executes them highest first.

use serde::{Deserialize, Serialize};

/// Priority of a sub-query, ordered from highest to lowest.
///
/// Discriminants are inverted (`High = 0`, `Low = 2`) so that the derived
/// [`Ord`] sorts high-priority work first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must be answered for the report to be useful.
    High = 0,
    /// Supporting detail.
    #[default]
    Medium = 1,
    /// Nice to have.
    Low = 2,
}

impl Priority {
    /// Parses a priority string (case-insensitive). Unknown values and
    /// numeric ranks outside 1..=3 fall back to `Medium`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "critical" | "1" => Self::High,
            "low" | "3" => Self::Low,
            _ => Self::Medium,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse("HIGH"), Priority::High);
        assert_eq!(Priority::parse("critical"), Priority::High);
        assert_eq!(Priority::parse("low"), Priority::Low);
        assert_eq!(Priority::parse("3"), Priority::Low);
        assert_eq!(Priority::parse("whatever"), Priority::Medium);
    }

    #[test]
    fn test_priority_sort_is_stable_high_first() {
        let mut items = vec![
            (Priority::Low, "a"),
            (Priority::High, "b"),
            (Priority::Medium, "c"),
            (Priority::High, "d"),
        ];
        items.sort_by_key(|(p, _)| *p);
        let order: Vec<&str> = items.iter().map(|(_, n)| *n).collect();
        assert_eq!(order, vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_priority_serde() {
        let p: Priority = serde_json::from_str("\"low\"").unwrap_or_default();
        assert_eq!(p, Priority::Low);
        assert_eq!(format!("{}", Priority::High), "high");
    }
}
