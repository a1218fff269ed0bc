//! Engine configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! The resulting [`EngineConfig`] is passed into the engine at construction;
//! nothing reads the environment after `build()`.

use std::path::PathBuf;
use std::time::Duration;

use crate::agent::prompt::PromptSet;
use crate::error::EngineError;

/// Default model for the primary provider.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default per-call provider timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default attempt budget per provider.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay for exponential backoff.
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
/// Default cache entry lifetime in seconds.
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
/// Default maximum number of cache entries.
const DEFAULT_CACHE_CAPACITY: usize = 1000;
/// Default number of quality retries for single-shot strategies.
const DEFAULT_QUALITY_RETRIES: u32 = 1;
/// Queries longer than this many characters route to THINKING.
const DEFAULT_ROUTE_LENGTH_THRESHOLD: usize = 200;
/// Default cap on research sub-queries.
const DEFAULT_MAX_SUB_QUERIES: usize = 5;
/// Default context size that triggers compression.
const DEFAULT_CONTEXT_COMPRESS_THRESHOLD: usize = 40;
/// Default number of entries kept live after compression.
const DEFAULT_CONTEXT_KEEP_LAST: usize = 10;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 8;
/// Default lifecycle event channel capacity.
const DEFAULT_EVENT_BUFFER: usize = 64;

/// One entry of the provider fallback chain.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Name used in logs and aggregate failures.
    pub name: String,
    /// Adapter kind (e.g. `"openai"`).
    pub kind: String,
    /// API key.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model served by this provider.
    pub model: String,
}

impl ProviderConfig {
    /// Creates an `openai`-kind provider entry.
    pub fn openai(
        name: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: "openai".to_string(),
            api_key: api_key.into(),
            base_url: None,
            model: model.into(),
        }
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Configuration for the routing engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ordered provider fallback chain.
    pub providers: Vec<ProviderConfig>,
    /// Default per-call provider timeout.
    pub timeout: Duration,
    /// Attempts per provider before falling through (0 is treated as 1).
    pub max_retries: u32,
    /// Base delay of the exponential backoff.
    pub retry_base_delay: Duration,
    /// Lifetime of a cached response.
    pub cache_ttl: Duration,
    /// Maximum number of cached responses.
    pub cache_capacity: usize,
    /// Regeneration budget when a strategy produces an inadequate answer.
    pub quality_retries: u32,
    /// AUTO queries longer than this route to THINKING.
    pub route_length_threshold: usize,
    /// Maximum research sub-queries executed per request.
    pub max_sub_queries: usize,
    /// Research context size that triggers compression.
    pub context_compress_threshold: usize,
    /// Entries kept live when the research context is compressed.
    pub context_keep_last: usize,
    /// Maximum tool-calling loop iterations before aborting.
    pub max_tool_iterations: usize,
    /// Capacity of the streaming event channel.
    pub event_buffer: usize,
    /// Directory for archived context and research reports.
    ///
    /// When unset, archives are kept in memory for the engine's lifetime.
    pub archive_dir: Option<PathBuf>,
    /// Directory containing prompt template files.
    ///
    /// Missing files fall back to compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Creates a new builder for `EngineConfig`.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    providers: Option<Vec<ProviderConfig>>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    fallback_api_key: Option<String>,
    fallback_base_url: Option<String>,
    fallback_model: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_base_delay: Option<Duration>,
    cache_ttl: Option<Duration>,
    cache_capacity: Option<usize>,
    quality_retries: Option<u32>,
    route_length_threshold: Option<usize>,
    max_sub_queries: Option<usize>,
    context_compress_threshold: Option<usize>,
    context_keep_last: Option<usize>,
    max_tool_iterations: Option<usize>,
    event_buffer: Option<usize>,
    archive_dir: Option<PathBuf>,
    prompt_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl EngineConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("COGROUTE_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("COGROUTE_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("COGROUTE_MODEL").ok();
        }
        if self.fallback_api_key.is_none() {
            self.fallback_api_key = std::env::var("COGROUTE_FALLBACK_API_KEY").ok();
        }
        if self.fallback_base_url.is_none() {
            self.fallback_base_url = std::env::var("COGROUTE_FALLBACK_BASE_URL").ok();
        }
        if self.fallback_model.is_none() {
            self.fallback_model = std::env::var("COGROUTE_FALLBACK_MODEL").ok();
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("COGROUTE_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.max_retries.is_none() {
            self.max_retries = env_parse("COGROUTE_MAX_RETRIES");
        }
        if self.cache_ttl.is_none() {
            self.cache_ttl = env_parse("COGROUTE_CACHE_TTL_SECS").map(Duration::from_secs);
        }
        if self.cache_capacity.is_none() {
            self.cache_capacity = env_parse("COGROUTE_CACHE_CAPACITY");
        }
        if self.max_sub_queries.is_none() {
            self.max_sub_queries = env_parse("COGROUTE_MAX_SUB_QUERIES");
        }
        if self.archive_dir.is_none() {
            self.archive_dir = std::env::var("COGROUTE_ARCHIVE_DIR").ok().map(PathBuf::from);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("COGROUTE_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Replaces the provider chain with an explicit list.
    ///
    /// Overrides the single-provider settings (`api_key`, `model`, ...).
    #[must_use]
    pub fn providers(mut self, providers: Vec<ProviderConfig>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Sets the primary provider's API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the primary provider's base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the primary provider's model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the fallback provider's API key, enabling the fallback provider.
    #[must_use]
    pub fn fallback_api_key(mut self, key: impl Into<String>) -> Self {
        self.fallback_api_key = Some(key.into());
        self
    }

    /// Sets the fallback provider's model.
    #[must_use]
    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    /// Sets the default provider timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the per-provider attempt budget.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the backoff base delay.
    #[must_use]
    pub const fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = Some(delay);
        self
    }

    /// Sets the cache TTL.
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets the cache capacity.
    #[must_use]
    pub const fn cache_capacity(mut self, n: usize) -> Self {
        self.cache_capacity = Some(n);
        self
    }

    /// Sets the quality-retry budget.
    #[must_use]
    pub const fn quality_retries(mut self, n: u32) -> Self {
        self.quality_retries = Some(n);
        self
    }

    /// Sets the AUTO routing length threshold.
    #[must_use]
    pub const fn route_length_threshold(mut self, n: usize) -> Self {
        self.route_length_threshold = Some(n);
        self
    }

    /// Sets the research sub-query cap.
    #[must_use]
    pub const fn max_sub_queries(mut self, n: usize) -> Self {
        self.max_sub_queries = Some(n);
        self
    }

    /// Sets the context compression threshold and the number of kept entries.
    #[must_use]
    pub const fn context_compression(mut self, threshold: usize, keep_last: usize) -> Self {
        self.context_compress_threshold = Some(threshold);
        self.context_keep_last = Some(keep_last);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the streaming event channel capacity.
    #[must_use]
    pub const fn event_buffer(mut self, n: usize) -> Self {
        self.event_buffer = Some(n);
        self
    }

    /// Sets the archive directory.
    #[must_use]
    pub fn archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    fn resolve_providers(&mut self) -> Result<Vec<ProviderConfig>, EngineError> {
        if let Some(providers) = self.providers.take() {
            if let Some(missing) = providers.iter().find(|p| p.api_key.is_empty()) {
                return Err(EngineError::ApiKeyMissing {
                    provider: missing.name.clone(),
                });
            }
            return Ok(providers);
        }

        let api_key = self.api_key.take().ok_or_else(|| EngineError::ApiKeyMissing {
            provider: "primary".to_string(),
        })?;
        let mut primary = ProviderConfig::openai(
            "primary",
            api_key,
            self.model.take().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        );
        primary.base_url = self.base_url.take();

        let mut chain = vec![primary];
        if let Some(key) = self.fallback_api_key.take() {
            let mut fallback = ProviderConfig::openai(
                "fallback",
                key,
                self.fallback_model
                    .take()
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            );
            fallback.base_url = self.fallback_base_url.take();
            chain.push(fallback);
        }
        Ok(chain)
    }

    /// Builds the [`EngineConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ApiKeyMissing`] if a provider has no API key
    /// and [`EngineError::NoProviders`] if the chain is empty.
    pub fn build(mut self) -> Result<EngineConfig, EngineError> {
        let providers = self.resolve_providers()?;
        if providers.is_empty() {
            return Err(EngineError::NoProviders);
        }

        Ok(EngineConfig {
            providers,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_base_delay: self
                .retry_base_delay
                .unwrap_or(Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS)),
            cache_ttl: self
                .cache_ttl
                .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            cache_capacity: self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
            quality_retries: self.quality_retries.unwrap_or(DEFAULT_QUALITY_RETRIES),
            route_length_threshold: self
                .route_length_threshold
                .unwrap_or(DEFAULT_ROUTE_LENGTH_THRESHOLD),
            max_sub_queries: self.max_sub_queries.unwrap_or(DEFAULT_MAX_SUB_QUERIES),
            context_compress_threshold: self
                .context_compress_threshold
                .unwrap_or(DEFAULT_CONTEXT_COMPRESS_THRESHOLD),
            context_keep_last: self.context_keep_last.unwrap_or(DEFAULT_CONTEXT_KEEP_LAST),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            event_buffer: self.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER).max(1),
            archive_dir: self.archive_dir,
            prompt_dir: self.prompt_dir.or_else(default_prompt_dir),
        })
    }
}

/// `~/.config/cogroute/prompts/` when it exists.
fn default_prompt_dir() -> Option<PathBuf> {
    PromptSet::default_dir().filter(|d| d.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = EngineConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].name, "primary");
        assert_eq!(config.providers[0].model, DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.max_sub_queries, 5);
        assert!(config.archive_dir.is_none());
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = EngineConfig::builder().build();
        assert!(matches!(result, Err(EngineError::ApiKeyMissing { .. })));
    }

    #[test]
    fn test_builder_empty_chain() {
        let result = EngineConfig::builder().providers(Vec::new()).build();
        assert!(matches!(result, Err(EngineError::NoProviders)));
    }

    #[test]
    fn test_builder_rejects_provider_without_key() {
        let result = EngineConfig::builder()
            .providers(vec![ProviderConfig::openai("backup", "", "m")])
            .build();
        assert!(matches!(
            result,
            Err(EngineError::ApiKeyMissing { ref provider }) if provider == "backup"
        ));
    }

    #[test]
    fn test_builder_fallback_provider() {
        let config = EngineConfig::builder()
            .api_key("k1")
            .model("gpt-4o")
            .fallback_api_key("k2")
            .fallback_model("llama3")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let names: Vec<&str> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["primary", "fallback"]);
        assert_eq!(config.providers[1].model, "llama3");
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EngineConfig::builder()
            .api_key("key")
            .max_retries(5)
            .cache_ttl(Duration::from_secs(10))
            .context_compression(20, 5)
            .event_buffer(0)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.context_compress_threshold, 20);
        assert_eq!(config.context_keep_last, 5);
        assert_eq!(config.event_buffer, 1);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = ProviderConfig::openai("p", "sk-secret", "m");
        assert!(!format!("{provider:?}").contains("sk-secret"));
    }
}
