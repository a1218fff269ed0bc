//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cogroute::llm::TokenUsage;
use cogroute::strategy::{Document, SearchHit};
use cogroute::{
    ChatRequest, ChatResponse, ChunkStream, Collaborators, Engine, EngineConfig, EngineError,
    LlmProvider, Retriever, WebSearch,
};
use futures_util::stream;

/// Provider that replays queued replies, then a fixed default answer.
pub struct Scripted {
    name: String,
    replies: Mutex<VecDeque<Result<String, EngineError>>>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl Scripted {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: EngineError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, reply: Result<String, EngineError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Last message of request `n`.
    pub fn prompt(&self, n: usize) -> String {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(n)
            .and_then(|r| r.messages.last())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    fn next(&self, request: &ChatRequest) -> Result<String, EngineError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Default answer from {}.", self.name)))
    }
}

#[async_trait]
impl LlmProvider for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError> {
        let content = self.next(request)?;
        Ok(ChatResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 20,
                completion_tokens: 10,
                total_tokens: 30,
            },
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn generate_stream(&self, request: &ChatRequest) -> Result<ChunkStream, EngineError> {
        let content = self.next(request)?;
        let chunks: Vec<Result<String, EngineError>> = content
            .split_inclusive(' ')
            .map(|c| Ok(c.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// A retryable provider failure.
pub fn outage(provider: &str) -> EngineError {
    EngineError::Provider {
        provider: provider.to_string(),
        message: "503 service unavailable".to_string(),
        status: Some(503),
        retryable: Some(true),
    }
}

pub fn config(max_retries: u32) -> EngineConfig {
    EngineConfig::builder()
        .api_key("test-key")
        .max_retries(max_retries)
        .retry_base_delay(Duration::ZERO)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_else(|_| unreachable!())
}

pub fn engine(providers: &[&Arc<Scripted>], collaborators: Collaborators) -> Engine {
    let chain: Vec<Arc<dyn LlmProvider>> = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn LlmProvider>)
        .collect();
    Engine::with_providers(&config(2), chain, collaborators).unwrap_or_else(|_| unreachable!())
}

pub struct StaticSearch;

#[async_trait]
impl WebSearch for StaticSearch {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchHit>, EngineError> {
        Ok(vec![SearchHit {
            title: format!("Result for {query}"),
            url: format!("https://search.test/{}", query.replace(' ', "+")),
            snippet: format!("Everything about {query}."),
        }])
    }

    async fn fetch(&self, url: &str) -> Result<String, EngineError> {
        Ok(format!("contents of {url}"))
    }
}

pub struct StaticRetriever;

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, limit: usize) -> Result<Vec<Document>, EngineError> {
        Ok((0..limit.min(2))
            .map(|i| Document {
                id: format!("doc-{i}"),
                content: format!("Document {i} says the warranty lasts two years."),
                score: 1.0 - f64::from(u32::try_from(i).unwrap_or(0)) * 0.1,
                source: None,
            })
            .collect())
    }
}
