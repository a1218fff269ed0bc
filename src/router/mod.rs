//! Mode resolution and cache short-circuit.

pub mod heuristics;

use std::sync::Arc;

use tracing::debug;

use crate::cache::ResponseCache;
use crate::core::{CognitiveLevel, Mode, Request};

pub use heuristics::{IntentSignal, classify_intent, detect_signal};

/// Router settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// `Auto` queries longer than this many characters route to `Thinking`.
    pub length_threshold: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            length_threshold: 200,
        }
    }
}

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Resolved mode; never `Auto`.
    pub mode: Mode,
    /// Cognitive level of `mode`.
    pub level: CognitiveLevel,
    /// Cached result for (query, mode), if any.
    pub cached: Option<String>,
}

/// Resolves request modes and consults the response cache.
#[derive(Debug, Clone)]
pub struct ModeRouter {
    config: RouterConfig,
    cache: Arc<ResponseCache>,
}

impl ModeRouter {
    /// Creates a router over a shared cache.
    #[must_use]
    pub const fn new(config: RouterConfig, cache: Arc<ResponseCache>) -> Self {
        Self { config, cache }
    }

    /// Resolves the request's mode and cognitive level without touching the cache.
    #[must_use]
    pub fn resolve(&self, request: &Request) -> (Mode, CognitiveLevel) {
        let mode = match request.mode() {
            Mode::Auto => classify_intent(request.query(), self.config.length_threshold),
            explicit => explicit,
        };
        (mode, mode.cognitive_level())
    }

    /// Resolves the mode, then looks up a cached result for it.
    #[must_use]
    pub fn route(&self, request: &Request) -> Route {
        let (mode, level) = self.resolve(request);
        let cached = self.cache.get(request.query(), mode);
        debug!(
            trace_id = request.trace_id(),
            mode = %mode,
            level = %level,
            cache_hit = cached.is_some(),
            "request routed"
        );
        Route {
            mode,
            level,
            cached,
        }
    }

    /// The shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}
