//! Request and response types exchanged with the engine.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::LifecycleEvent;
use super::mode::{CognitiveLevel, Mode};
use crate::error::ErrorReport;

/// Sampling parameters forwarded to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Per-call provider timeout; the configured default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// An incoming query. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    query: String,
    mode: Mode,
    sampling: SamplingParams,
    context: BTreeMap<String, serde_json::Value>,
    trace_id: String,
    stream: bool,
}

impl Request {
    /// Creates an `Auto`-mode request with a fresh trace identifier.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: Mode::Auto,
            sampling: SamplingParams::default(),
            context: BTreeMap::new(),
            trace_id: Uuid::new_v4().to_string(),
            stream: false,
        }
    }

    /// Sets the requested mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets sampling parameters.
    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Adds one caller-supplied context value.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Overrides the generated trace identifier.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Requests incremental output.
    #[must_use]
    pub const fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Requested mode (may be `Auto`).
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Sampling parameters.
    #[must_use]
    pub const fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    /// Caller-supplied context map.
    #[must_use]
    pub const fn context(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.context
    }

    /// Trace identifier.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Whether incremental output was requested.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.stream
    }
}

/// Token and latency metrics for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetrics {
    /// Prompt tokens across all provider calls.
    pub prompt_tokens: u32,
    /// Completion tokens across all provider calls.
    pub completion_tokens: u32,
    /// Total tokens across all provider calls.
    pub total_tokens: u32,
    /// Number of successful provider calls.
    pub provider_calls: u32,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u64,
}

/// The engine's answer to a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Result text (empty on failure).
    pub text: String,
    /// Resolved mode; never `Auto`.
    pub mode: Mode,
    /// Cognitive level of the resolved mode.
    pub cognitive_level: CognitiveLevel,
    /// Trace identifier copied from the request.
    pub trace_id: String,
    /// Usage and latency.
    pub metrics: ResponseMetrics,
    /// Lifecycle events in emission order.
    pub events: Vec<LifecycleEvent>,
    /// Side-channel results (cache hit flag, plan, workflow state).
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Structured failure, when the request did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl Response {
    /// Returns `true` if the request produced a result.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns `true` if the result came from the response cache.
    #[must_use]
    pub fn is_cache_hit(&self) -> bool {
        self.metadata
            .get("cache_hit")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = Request::new("Hello");
        assert_eq!(req.query(), "Hello");
        assert_eq!(req.mode(), Mode::Auto);
        assert!(!req.is_streaming());
        assert!(Uuid::parse_str(req.trace_id()).is_ok());
    }

    #[test]
    fn test_trace_ids_are_unique() {
        assert_ne!(Request::new("a").trace_id(), Request::new("a").trace_id());
    }

    #[test]
    fn test_request_builders() {
        let req = Request::new("q")
            .with_mode(Mode::Code)
            .with_context("lang", serde_json::json!("rust"))
            .with_trace_id("trace-1")
            .streaming(true);
        assert_eq!(req.mode(), Mode::Code);
        assert_eq!(req.trace_id(), "trace-1");
        assert_eq!(req.context().get("lang"), Some(&serde_json::json!("rust")));
        assert!(req.is_streaming());
    }
}
