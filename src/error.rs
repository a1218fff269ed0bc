//! Error types for cogroute.
//!
//! [`EngineError`] covers every failure the routing engine can observe,
//! from provider transport errors to workflow state violations. The CLI
//! layer wraps it in the umbrella [`Error`] alongside [`CommandError`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure taxonomy used for retry and propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Transport failure: timeouts, refused connections, DNS.
    Network,
    /// Provider-side throttling or context-length rejection.
    Provider,
    /// Memory or resource exhaustion.
    ResourceLimit,
    /// Deterministic input-validation failure.
    Business,
    /// Anything not matched by the other categories.
    Unknown,
}

impl ErrorCategory {
    /// Default retry verdict for the category.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Provider)
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "NETWORK",
            Self::Provider => "PROVIDER",
            Self::ResourceLimit => "RESOURCE_LIMIT",
            Self::Business => "BUSINESS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final error of a single provider inside an exhausted fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// Provider name.
    pub provider: String,
    /// Display text of the provider's last error.
    pub error: String,
}

/// Errors raised by the routing engine and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A provider call failed.
    ///
    /// `retryable` is the adapter's explicit verdict; when present it
    /// overrides message-based classification.
    #[error("provider '{provider}' request failed: {message}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Error detail from the provider or transport.
        message: String,
        /// HTTP status, when the transport exposed one.
        status: Option<u16>,
        /// Explicit retryability verdict from the adapter.
        retryable: Option<bool>,
    },

    /// A provider call exceeded its deadline.
    #[error("provider '{provider}' request timed out after {}ms", elapsed.as_millis())]
    Timeout {
        /// Provider name.
        provider: String,
        /// Deadline that elapsed.
        elapsed: Duration,
    },

    /// A streaming response failed.
    #[error("stream error: {message}")]
    Stream {
        /// Error detail.
        message: String,
        /// Explicit retryability verdict from the adapter.
        retryable: Option<bool>,
    },

    /// Every provider in the fallback chain exhausted its retry budget.
    #[error("all {} providers failed: {}", failures.len(), format_failures(failures))]
    FallbackExhausted {
        /// Final error of each provider, in chain order.
        failures: Vec<ProviderFailure>,
    },

    /// The fallback chain was constructed without providers.
    #[error("invalid configuration: no providers configured")]
    NoProviders,

    /// API key missing for a configured provider.
    #[error("API key missing for provider '{provider}'. Set OPENAI_API_KEY or COGROUTE_API_KEY")]
    ApiKeyMissing {
        /// Provider name.
        provider: String,
    },

    /// Provider kind has no adapter.
    #[error("unsupported provider kind: {name}")]
    UnsupportedProvider {
        /// Requested kind.
        name: String,
    },

    /// The request itself is malformed.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong.
        message: String,
    },

    /// The model's output could not be parsed.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// Parse failure detail.
        message: String,
        /// Raw model output.
        content: String,
    },

    /// A strategy needs an external collaborator that was not configured.
    #[error("required collaborator missing: {collaborator}")]
    CollaboratorMissing {
        /// Collaborator name (e.g. `"retriever"`).
        collaborator: &'static str,
    },

    /// An external collaborator (retriever, search backend, sandbox) failed.
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        /// Collaborator name.
        collaborator: &'static str,
        /// Error detail.
        message: String,
    },

    /// A tool call could not be executed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Error detail.
        message: String,
    },

    /// The model kept requesting tools beyond the iteration limit.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured limit.
        max_iterations: usize,
    },

    /// Archive sink read or write failed.
    #[error("archive I/O failed for '{path}': {message}")]
    Archive {
        /// Archive path.
        path: String,
        /// Error detail.
        message: String,
    },

    /// A workflow state transition was rejected.
    #[error("invalid workflow transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: &'static str,
        /// Requested status.
        to: &'static str,
    },

    /// A research workflow step failed unrecoverably.
    #[error("workflow step '{step}' failed: {message}")]
    Workflow {
        /// Step name.
        step: &'static str,
        /// Error detail.
        message: String,
    },
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.provider, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    /// Explicit retryability attribute carried by the error, if any.
    #[must_use]
    pub const fn retryable_attribute(&self) -> Option<bool> {
        match self {
            Self::Provider { retryable, .. } | Self::Stream { retryable, .. } => *retryable,
            _ => None,
        }
    }

    /// Category fixed by the error's type rather than its message.
    #[must_use]
    pub const fn category_hint(&self) -> Option<ErrorCategory> {
        match self {
            Self::Timeout { .. } => Some(ErrorCategory::Network),
            Self::FallbackExhausted { .. } => Some(ErrorCategory::Provider),
            Self::InvalidRequest { .. }
            | Self::NoProviders
            | Self::CollaboratorMissing { .. }
            | Self::InvalidTransition { .. } => Some(ErrorCategory::Business),
            _ => None,
        }
    }

    /// Shorthand for an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

/// Structured error result returned to callers instead of a raw error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Failure category.
    pub category: ErrorCategory,
    /// Original error message.
    pub message: String,
    /// Trace identifier of the failed request.
    pub trace_id: String,
    /// Whether the failure would have been retryable.
    pub retryable: bool,
}

impl ErrorReport {
    /// Builds a report for `error` under the given trace identifier.
    #[must_use]
    pub fn from_error(error: &EngineError, trace_id: &str) -> Self {
        Self {
            category: crate::resilience::classify(error),
            message: error.to_string(),
            trace_id: trace_id.to_string(),
            retryable: crate::resilience::is_retryable(error),
        }
    }
}

/// Errors raised by CLI command handling.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command could not complete.
    #[error("command failed: {0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),

    /// Argument value rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Umbrella error for the binary.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ErrorCategory::ResourceLimit).unwrap_or_default();
        assert_eq!(json, "\"RESOURCE_LIMIT\"");
    }

    #[test]
    fn test_fallback_exhausted_lists_every_provider() {
        let err = EngineError::FallbackExhausted {
            failures: vec![
                ProviderFailure {
                    provider: "primary".to_string(),
                    error: "connection refused".to_string(),
                },
                ProviderFailure {
                    provider: "backup".to_string(),
                    error: "rate limit".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("all 2 providers failed"));
        assert!(msg.contains("[primary] connection refused"));
        assert!(msg.contains("[backup] rate limit"));
    }

    #[test]
    fn test_retryable_attribute_only_on_provider_errors() {
        let err = EngineError::Provider {
            provider: "p".to_string(),
            message: "boom".to_string(),
            status: None,
            retryable: Some(true),
        };
        assert_eq!(err.retryable_attribute(), Some(true));
        assert_eq!(
            EngineError::invalid_request("empty").retryable_attribute(),
            None
        );
    }
}
