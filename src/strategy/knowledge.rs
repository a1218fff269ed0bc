//! KNOWLEDGE: retrieval-augmented answer.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{Document, Services, StrategyContext, StrategyHandler, generate};
use crate::core::Mode;
use crate::error::EngineError;

/// Documents requested from the retriever.
const RETRIEVAL_LIMIT: usize = 5;

/// Answers from documents returned by the [`Retriever`](super::Retriever).
#[derive(Debug)]
pub struct KnowledgeStrategy {
    services: Arc<Services>,
}

impl KnowledgeStrategy {
    /// Creates the handler.
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

/// Formats documents into the `<documents>` block of the prompt.
fn build_prompt(query: &str, documents: &[Document]) -> String {
    let mut prompt = String::from("<documents>\n");
    if documents.is_empty() {
        prompt.push_str("(no documents found)\n");
    }
    for doc in documents {
        let _ = write!(
            prompt,
            "<document id=\"{id}\" score=\"{score:.3}\">\n{content}\n</document>\n",
            id = doc.id,
            score = doc.score,
            content = doc.content,
        );
    }
    let _ = write!(prompt, "</documents>\n\n<question>{query}</question>");
    prompt
}

#[async_trait]
impl StrategyHandler for KnowledgeStrategy {
    fn mode(&self) -> Mode {
        Mode::Knowledge
    }

    async fn process(&self, ctx: &mut StrategyContext<'_>) -> Result<String, EngineError> {
        let retriever = self.services.collaborators.require_retriever()?;
        let query = ctx.request.query().to_string();

        ctx.progress("retrieve", "retrieving documents").await;
        let documents = retriever.retrieve(&query, RETRIEVAL_LIMIT).await?;
        ctx.set_metadata(
            "sources",
            json!(documents.iter().map(|d| &d.id).collect::<Vec<_>>()),
        );

        let prompt = build_prompt(&query, &documents);
        generate(&self.services, ctx, &self.services.prompts.knowledge, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::core::{EventRecorder, Request};
    use crate::strategy::tests::services;
    use crate::strategy::{Collaborators, Retriever};
    use crate::test_support::ScriptedProvider;

    struct FixedRetriever;

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn retrieve(&self, _query: &str, limit: usize) -> Result<Vec<Document>, EngineError> {
            assert_eq!(limit, RETRIEVAL_LIMIT);
            Ok(vec![Document {
                id: "doc-1".to_string(),
                content: "Tokio is an async runtime.".to_string(),
                score: 0.9,
                source: None,
            }])
        }
    }

    #[tokio::test]
    async fn test_knowledge_grounds_prompt_in_documents() {
        let provider = Arc::new(ScriptedProvider::new("mock"));
        let collaborators = Collaborators::none().with_retriever(Arc::new(FixedRetriever));
        let strategy = KnowledgeStrategy::new(services(&provider, collaborators));
        let request = Request::new("what is tokio");
        let mut ctx = StrategyContext::new(&request, Mode::Knowledge, EventRecorder::new());

        assert!(strategy.process(&mut ctx).await.is_ok());
        let prompt = provider.prompt(0);
        assert!(prompt.contains(r#"<document id="doc-1""#));
        assert!(prompt.contains("<question>what is tokio</question>"));
        assert_eq!(ctx.metadata["sources"], json!(["doc-1"]));
    }

    #[tokio::test]
    async fn test_knowledge_requires_retriever() {
        let provider = Arc::new(ScriptedProvider::new("mock"));
        let strategy = KnowledgeStrategy::new(services(&provider, Collaborators::none()));
        let request = Request::new("q");
        let mut ctx = StrategyContext::new(&request, Mode::Knowledge, EventRecorder::new());

        let result = strategy.process(&mut ctx).await;
        assert!(matches!(
            result,
            Err(EngineError::CollaboratorMissing { collaborator: "retriever" })
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_build_prompt_without_documents() {
        assert!(build_prompt("q", &[]).contains("(no documents found)"));
    }
}
