//! Failure classification.
//!
//! Maps any [`EngineError`] to an [`ErrorCategory`] and a retry verdict.
//! Classification is pure: it inspects the error's variant first, then its
//! message, and never performs I/O.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{EngineError, ErrorCategory};

/// Transport failures.
static NETWORK_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(timeouts?|timed out|connections?|connect|dns|network|sockets?|unreachable)\b",
    )
    .ok()
});

/// Provider-side throttling, overload and context-length rejections.
static PROVIDER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(rate[ _]limit(ed|_exceeded)?|too many requests|429|quota|overloaded|context[ _]length(_exceeded)?|maximum context|502|503|server[ _]error)\b",
    )
    .ok()
});

/// Memory and resource exhaustion.
static RESOURCE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(out of memory|memory|oom|resource exhausted|allocation failed)\b").ok()
});

/// Deterministic input-validation failures.
static BUSINESS_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(invalid|bad argument|missing|validation|not found|unsupported|pars(e|ing))\b",
    )
    .ok()
});

/// Classifies an error into a failure category.
///
/// Precedence: the variant's fixed category, an HTTP status when present,
/// then message patterns in the order network, provider, resource,
/// business. Anything unmatched is [`ErrorCategory::Unknown`].
#[must_use]
pub fn classify(error: &EngineError) -> ErrorCategory {
    if let Some(category) = error.category_hint() {
        return category;
    }

    if let EngineError::Provider {
        status: Some(status),
        ..
    } = error
    {
        match status {
            429 | 500..=599 => return ErrorCategory::Provider,
            400..=499 => return ErrorCategory::Business,
            _ => {}
        }
    }

    classify_message(&detail(error))
}

/// The error's own message, without provider or collaborator names.
fn detail(error: &EngineError) -> Cow<'_, str> {
    match error {
        EngineError::Provider { message, .. }
        | EngineError::Stream { message, .. }
        | EngineError::Collaborator { message, .. }
        | EngineError::ToolExecution { message, .. } => Cow::Borrowed(message),
        other => Cow::Owned(other.to_string()),
    }
}

/// Classifies a bare error message.
#[must_use]
pub fn classify_message(message: &str) -> ErrorCategory {
    let matches = |re: &LazyLock<Option<Regex>>| {
        re.as_ref().is_some_and(|re| re.is_match(message))
    };

    if matches(&NETWORK_RE) {
        ErrorCategory::Network
    } else if matches(&PROVIDER_RE) {
        ErrorCategory::Provider
    } else if matches(&RESOURCE_RE) {
        ErrorCategory::ResourceLimit
    } else if matches(&BUSINESS_RE) {
        ErrorCategory::Business
    } else {
        ErrorCategory::Unknown
    }
}

/// Returns whether retrying `error` could succeed.
///
/// An explicit retryable attribute set by the provider adapter wins;
/// otherwise the category's default verdict applies.
#[must_use]
pub fn is_retryable(error: &EngineError) -> bool {
    error
        .retryable_attribute()
        .unwrap_or_else(|| classify(error).is_retryable())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn provider_error(message: &str) -> EngineError {
        EngineError::Provider {
            provider: "p".to_string(),
            message: message.to_string(),
            status: None,
            retryable: None,
        }
    }

    #[test_case("connection refused", ErrorCategory::Network ; "connection")]
    #[test_case("DNS lookup failed", ErrorCategory::Network ; "dns")]
    #[test_case("Rate limit reached for requests", ErrorCategory::Provider ; "rate limit")]
    #[test_case("maximum context length is 8192 tokens", ErrorCategory::Provider ; "context length")]
    #[test_case("CUDA out of memory", ErrorCategory::ResourceLimit ; "oom")]
    #[test_case("invalid argument: temperature", ErrorCategory::Business ; "validation")]
    #[test_case("something odd happened", ErrorCategory::Unknown ; "unknown")]
    fn test_classify_message(message: &str, expected: ErrorCategory) {
        assert_eq!(classify(&provider_error(message)), expected);
    }

    #[test_case("no room left in the queue" ; "room")]
    #[test_case("zoom level unavailable" ; "zoom")]
    #[test_case("sparse matrix rejected" ; "sparse")]
    fn test_patterns_need_whole_words(message: &str) {
        assert_eq!(classify_message(message), ErrorCategory::Unknown);
    }

    #[test]
    fn test_provider_name_does_not_classify() {
        let err = EngineError::Provider {
            provider: "dns-proxy".to_string(),
            message: "something odd happened".to_string(),
            status: None,
            retryable: None,
        };
        assert_eq!(classify(&err), ErrorCategory::Unknown);
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_network_wins_over_business() {
        assert_eq!(
            classify_message("invalid response: connection reset"),
            ErrorCategory::Network
        );
    }

    #[test]
    fn test_timeout_variant_is_network() {
        let err = EngineError::Timeout {
            provider: "p".to_string(),
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(classify(&err), ErrorCategory::Network);
        assert!(is_retryable(&err));
    }

    #[test]
    fn test_status_codes() {
        let err = |status| EngineError::Provider {
            provider: "p".to_string(),
            message: "request failed".to_string(),
            status: Some(status),
            retryable: None,
        };
        assert_eq!(classify(&err(429)), ErrorCategory::Provider);
        assert_eq!(classify(&err(503)), ErrorCategory::Provider);
        assert_eq!(classify(&err(401)), ErrorCategory::Business);
    }

    #[test]
    fn test_explicit_attribute_wins() {
        let err = EngineError::Provider {
            provider: "p".to_string(),
            message: "something odd happened".to_string(),
            status: None,
            retryable: Some(true),
        };
        assert_eq!(classify(&err), ErrorCategory::Unknown);
        assert!(is_retryable(&err));

        let err = EngineError::Provider {
            provider: "p".to_string(),
            message: "connection refused".to_string(),
            status: None,
            retryable: Some(false),
        };
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_business_variants_not_retryable() {
        assert!(!is_retryable(&EngineError::invalid_request("empty query")));
        assert!(!is_retryable(&EngineError::CollaboratorMissing {
            collaborator: "retriever"
        }));
        assert!(!is_retryable(&EngineError::NoProviders));
    }

    proptest! {
        #[test]
        fn prop_network_messages_always_retryable(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
            let err = provider_error(&format!("{prefix} connection {suffix}"));
            prop_assert_eq!(classify(&err), ErrorCategory::Network);
            prop_assert!(is_retryable(&err));
        }

        #[test]
        fn prop_business_never_retryable(message in "[a-z ]{0,40}") {
            let err = EngineError::invalid_request(message);
            prop_assert_eq!(classify(&err), ErrorCategory::Business);
            prop_assert!(!is_retryable(&err));
        }
    }
}
