//! Provider registry and factory.
//!
//! Maps provider kinds to concrete [`LlmProvider`] implementations and
//! assembles the ordered fallback chain from an [`EngineConfig`].

use std::sync::Arc;

use crate::config::{EngineConfig, ProviderConfig};
use crate::error::EngineError;
use crate::llm::provider::LlmProvider;

/// Creates an [`LlmProvider`] for one chain entry.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`EngineError::UnsupportedProvider`] for unknown kinds, or when
/// the crate was built without the matching adapter feature.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, EngineError> {
    match config.kind.as_str() {
        #[cfg(feature = "openai")]
        "openai" => Ok(Arc::new(super::providers::OpenAiProvider::new(config))),
        other => Err(EngineError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Creates every provider of the configured chain, in priority order.
///
/// # Errors
///
/// Returns the first factory error, or [`EngineError::NoProviders`] for an
/// empty chain.
pub fn create_chain(config: &EngineConfig) -> Result<Vec<Arc<dyn LlmProvider>>, EngineError> {
    if config.providers.is_empty() {
        return Err(EngineError::NoProviders);
    }
    config.providers.iter().map(create_provider).collect()
}
