//! Error preservation.
//!
//! A failed or inadequate answer is fed back into the retry prompt instead
//! of being discarded, so the model can see what went wrong.

/// Answers shorter than this many characters (after trimming) are inadequate.
pub const DEFAULT_MIN_LENGTH: usize = 20;

/// Retry prompt builder and adequacy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPreservation {
    min_length: usize,
}

impl Default for ErrorPreservation {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

impl ErrorPreservation {
    /// Creates a checker with a custom minimum answer length.
    #[must_use]
    pub const fn with_min_length(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Builds a prompt that embeds the failed attempt and asks for a better one.
    #[must_use]
    pub fn build_retry_prompt(
        &self,
        original_query: &str,
        failed_result: &str,
        error_info: Option<&str>,
    ) -> String {
        let attempt = if failed_result.trim().is_empty() {
            "(empty response)"
        } else {
            failed_result
        };
        let mut prompt = format!(
            "{original_query}\n\n<previous_attempt>\n{attempt}\n</previous_attempt>\n"
        );
        if let Some(info) = error_info.filter(|i| !i.trim().is_empty()) {
            prompt.push_str(&format!("<error>\n{info}\n</error>\n"));
        }
        prompt.push_str(
            "\nThe previous attempt was inadequate. Provide a complete, improved answer \
             to the original request.",
        );
        prompt
    }

    /// Whether another attempt should be made.
    ///
    /// True only while `current_retry < max_retries` and the result is
    /// empty, whitespace-only, or shorter than the minimum length.
    #[must_use]
    pub fn should_retry(&self, result: &str, max_retries: u32, current_retry: u32) -> bool {
        current_retry < max_retries && result.trim().chars().count() < self.min_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry_cases() {
        let ep = ErrorPreservation::default();
        assert!(ep.should_retry("", 1, 0));
        assert!(ep.should_retry("   \n", 1, 0));
        assert!(ep.should_retry("too short", 1, 0));
        assert!(!ep.should_retry("adequate detailed answer text", 1, 0));
        assert!(!ep.should_retry("", 1, 1));
        assert!(!ep.should_retry("short", 0, 0));
    }

    #[test]
    fn test_retry_prompt_embeds_attempt_and_error() {
        let prompt = ErrorPreservation::default().build_retry_prompt(
            "What is Rust?",
            "A language",
            Some("answer too short"),
        );
        assert!(prompt.starts_with("What is Rust?"));
        assert!(prompt.contains("<previous_attempt>\nA language\n"));
        assert!(prompt.contains("<error>\nanswer too short\n"));
    }

    #[test]
    fn test_retry_prompt_without_error_info() {
        let prompt = ErrorPreservation::default().build_retry_prompt("q", "", None);
        assert!(prompt.contains("(empty response)"));
        assert!(!prompt.contains("<error>"));
    }
}
