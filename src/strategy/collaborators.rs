//! External collaborators consumed by strategies.
//!
//! Document storage, web transport and sandboxed execution live outside
//! this crate. Strategies only see these traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A retrieved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: String,
    /// Document text.
    pub content: String,
    /// Retrieval score; higher is more relevant.
    #[serde(default)]
    pub score: f64,
    /// Where the document came from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Result snippet.
    pub snippet: String,
}

/// Output of a sandboxed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
}

/// Document retrieval backend (KNOWLEDGE).
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns up to `limit` documents relevant to `query`, best first.
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Document>, EngineError>;
}

/// Web search backend (SEARCH, DEEP_RESEARCH, tools).
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Returns up to `limit` hits for `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, EngineError>;

    /// Returns the text content of `url`.
    async fn fetch(&self, url: &str) -> Result<String, EngineError>;
}

/// Sandboxed code runner (CODE, tools).
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    /// Runs `code` written in `language`.
    async fn execute(&self, language: &str, code: &str) -> Result<ExecutionOutput, EngineError>;

    /// Analyzes `code` without running it.
    async fn analyze(&self, code: &str) -> Result<String, EngineError>;
}

/// The set of configured collaborators. Any of them may be absent.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Document retriever.
    pub retriever: Option<Arc<dyn Retriever>>,
    /// Web search backend.
    pub web_search: Option<Arc<dyn WebSearch>>,
    /// Code sandbox.
    pub sandbox: Option<Arc<dyn CodeSandbox>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("retriever", &self.retriever.is_some())
            .field("web_search", &self.web_search.is_some())
            .field("sandbox", &self.sandbox.is_some())
            .finish()
    }
}

impl Collaborators {
    /// No collaborators.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the retriever.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Sets the web search backend.
    #[must_use]
    pub fn with_web_search(mut self, web_search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(web_search);
        self
    }

    /// Sets the code sandbox.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: Arc<dyn CodeSandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// The retriever, or [`EngineError::CollaboratorMissing`].
    ///
    /// # Errors
    ///
    /// Fails when no retriever is configured.
    pub fn require_retriever(&self) -> Result<&Arc<dyn Retriever>, EngineError> {
        self.retriever
            .as_ref()
            .ok_or(EngineError::CollaboratorMissing {
                collaborator: "retriever",
            })
    }

    /// The web search backend, or [`EngineError::CollaboratorMissing`].
    ///
    /// # Errors
    ///
    /// Fails when no web search backend is configured.
    pub fn require_web_search(&self) -> Result<&Arc<dyn WebSearch>, EngineError> {
        self.web_search
            .as_ref()
            .ok_or(EngineError::CollaboratorMissing {
                collaborator: "web_search",
            })
    }
}
