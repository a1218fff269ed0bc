//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. Parameter quirks of a vendor stay
//! inside its adapter and never leak into the fallback client.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::message::{ChatRequest, ChatResponse};
use crate::error::EngineError;

/// Stream of text chunks from a provider.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, EngineError>> + Send>>;

/// Trait for LLM provider backends.
///
/// Errors should carry an explicit retryability verdict
/// ([`EngineError::Provider::retryable`]) whenever the adapter can tell.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name used in logs and aggregate failures.
    fn name(&self) -> &str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on API failures or parse errors.
    async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError>;

    /// Executes a streaming chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on connection failures. Failures after the
    /// stream opened are yielded as stream items.
    async fn generate_stream(&self, request: &ChatRequest) -> Result<ChunkStream, EngineError>;
}
