//! Scripted in-process provider for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;

use crate::agent::tool::ToolCall;
use crate::error::EngineError;
use crate::llm::message::{ChatRequest, ChatResponse, TokenUsage};
use crate::llm::provider::{ChunkStream, LlmProvider};
use crate::resilience::{FallbackClient, RetryPolicy};

/// Provider that replays queued replies and records every request.
///
/// When the queue is empty it answers with `fallback_text`.
pub struct ScriptedProvider {
    name: String,
    replies: Mutex<VecDeque<Result<ChatResponse, EngineError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    fallback_text: String,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fallback_text: "This is a sufficiently long default answer.".to_string(),
        }
    }

    pub fn with_fallback_text(mut self, text: &str) -> Self {
        self.fallback_text = text.to_string();
        self
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text_response(text)));
        self
    }

    pub fn reply_tool_call(self, name: &str, arguments: &str) -> Self {
        let id = format!("call_{}", self.replies.lock().unwrap_or_else(PoisonError::into_inner).len());
        self.push(Ok(ChatResponse {
            content: String::new(),
            usage: usage(),
            tool_calls: vec![ToolCall {
                id,
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
            finish_reason: Some("tool_calls".to_string()),
        }));
        self
    }

    pub fn fail(self, error: EngineError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, reply: Result<ChatResponse, EngineError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Text of the last user message of request `n`.
    pub fn prompt(&self, n: usize) -> String {
        self.requests()
            .get(n)
            .and_then(|r| r.messages.last())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    fn next(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(text_response(&self.fallback_text)))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError> {
        self.next(request)
    }

    async fn generate_stream(&self, request: &ChatRequest) -> Result<ChunkStream, EngineError> {
        let response = self.next(request)?;
        let chunks: Vec<Result<String, EngineError>> = response
            .content
            .split_inclusive(' ')
            .map(|c| Ok(c.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

pub fn text_response(text: &str) -> ChatResponse {
    ChatResponse {
        content: text.to_string(),
        usage: usage(),
        tool_calls: Vec::new(),
        finish_reason: Some("stop".to_string()),
    }
}

const fn usage() -> TokenUsage {
    TokenUsage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    }
}

/// Single-provider client with one attempt and no backoff.
pub fn client(provider: &Arc<ScriptedProvider>) -> FallbackClient {
    FallbackClient::new(
        vec![Arc::clone(provider) as Arc<dyn LlmProvider>],
        RetryPolicy::new(1, Duration::ZERO),
        Duration::from_secs(5),
    )
    .unwrap_or_else(|_| unreachable!())
}
