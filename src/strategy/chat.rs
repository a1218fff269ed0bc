//! CHAT: direct conversational answer.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Services, StrategyContext, StrategyHandler, generate};
use crate::core::{Mode, Request};
use crate::error::EngineError;
use crate::llm::message::{ChatRequest, system_message, user_message};
use crate::llm::provider::ChunkStream;

/// Fast path: one model call, no collaborators.
#[derive(Debug)]
pub struct ChatStrategy {
    services: Arc<Services>,
}

impl ChatStrategy {
    /// Creates the handler.
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    /// Opens a chunk stream for `request` through the fallback chain.
    ///
    /// Streaming skips quality retries: chunks have already reached the
    /// caller by the time the answer could be judged.
    ///
    /// # Errors
    ///
    /// Fails when no provider produces a first chunk.
    pub async fn stream(&self, request: &Request) -> Result<ChunkStream, EngineError> {
        let chat = ChatRequest::new(vec![
            system_message(&self.services.prompts.chat),
            user_message(request.query()),
        ])
        .with_sampling(request.sampling());
        self.services.client.generate_stream(&chat).await
    }
}

#[async_trait]
impl StrategyHandler for ChatStrategy {
    fn mode(&self) -> Mode {
        Mode::Chat
    }

    async fn process(&self, ctx: &mut StrategyContext<'_>) -> Result<String, EngineError> {
        let query = ctx.request.query().to_string();
        generate(&self.services, ctx, &self.services.prompts.chat, &query).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::StreamExt;

    use super::*;
    use crate::core::EventRecorder;
    use crate::strategy::Collaborators;
    use crate::strategy::tests::services;
    use crate::test_support::ScriptedProvider;

    #[tokio::test]
    async fn test_chat_single_call() {
        let provider = Arc::new(ScriptedProvider::new("mock").reply("Hello! How can I help you today?"));
        let strategy = ChatStrategy::new(services(&provider, Collaborators::none()));
        let request = Request::new("Hello");
        let mut ctx = StrategyContext::new(&request, Mode::Chat, EventRecorder::new());

        let text = strategy.process(&mut ctx).await;

        assert_eq!(text.ok().as_deref(), Some("Hello! How can I help you today?"));
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.prompt(0), "Hello");
    }

    #[tokio::test]
    async fn test_chat_stream_yields_chunks() {
        let provider = Arc::new(ScriptedProvider::new("mock").reply("one two three"));
        let strategy = ChatStrategy::new(services(&provider, Collaborators::none()));

        let stream = strategy.stream(&Request::new("count")).await;
        let chunks: Vec<String> = match stream {
            Ok(s) => s.filter_map(|c| async move { c.ok() }).collect().await,
            Err(_) => unreachable!(),
        };
        assert_eq!(chunks.concat(), "one two three");
        assert!(chunks.len() > 1);
    }
}
