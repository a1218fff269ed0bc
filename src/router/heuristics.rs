//! Deterministic intent classifier for `Auto` requests.
//!
//! No model call is made: a query is analytical when it contains an
//! analytical-intent keyword, when a mixed keyword pair co-occurs, or when
//! it is longer than the configured threshold.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::Mode;

/// Comparison, causal and evaluative phrasing.
static ANALYTICAL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(why|compare|comparison|comparing|versus|vs|difference between|pros and cons|trade-?offs?|better than|worse than|cause[sd]?|because of|impact of|effect of|consequences?|implications?|evaluate|evaluation|assess|assessment|analy[sz]e|analysis|critique|justify|should i|how should i think about|what if)\b",
    )
    .ok()
});

/// Keyword pairs that together signal analysis even without an
/// analytical keyword. Matched as substrings of the lower-cased query.
const MIXED_PATTERNS: &[(&str, &str)] = &[
    ("trend", "analy"),
    ("trend", "predict"),
    ("future", "predict"),
    ("history", "impact"),
    ("data", "insight"),
    ("market", "forecast"),
    ("risk", "strategy"),
    ("cost", "benefit"),
];

/// Why a query was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSignal {
    /// Contained an analytical keyword.
    Keyword,
    /// Contained a mixed keyword pair.
    MixedPattern,
    /// Exceeded the length threshold.
    Length,
    /// None of the above.
    None,
}

/// Returns the first signal that marks `query` as analytical.
#[must_use]
pub fn detect_signal(query: &str, length_threshold: usize) -> IntentSignal {
    if ANALYTICAL_RE.as_ref().is_some_and(|re| re.is_match(query)) {
        return IntentSignal::Keyword;
    }

    let lower = query.to_lowercase();
    if MIXED_PATTERNS
        .iter()
        .any(|(a, b)| lower.contains(a) && lower.contains(b))
    {
        return IntentSignal::MixedPattern;
    }

    if query.chars().count() > length_threshold {
        return IntentSignal::Length;
    }

    IntentSignal::None
}

/// Classifies an `Auto` query as `Thinking` or `Chat`.
#[must_use]
pub fn classify_intent(query: &str, length_threshold: usize) -> Mode {
    match detect_signal(query, length_threshold) {
        IntentSignal::None => Mode::Chat,
        _ => Mode::Thinking,
    }
}
