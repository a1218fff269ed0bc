//! SEARCH: web search then answer with sources.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{SearchHit, Services, StrategyContext, StrategyHandler, generate};
use crate::core::Mode;
use crate::error::EngineError;

/// Hits requested per search.
const SEARCH_LIMIT: usize = 5;

/// Answers from web search hits.
///
/// Also serves each sub-query of a deep-research workflow.
#[derive(Debug)]
pub struct SearchStrategy {
    services: Arc<Services>,
}

impl SearchStrategy {
    /// Creates the handler.
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    /// Searches `search_query` and answers `question` from the hits.
    ///
    /// Returns the answer together with the hits it was grounded on.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::CollaboratorMissing`] without a search
    /// backend, and with backend or provider errors as-is.
    pub async fn answer(
        &self,
        ctx: &mut StrategyContext<'_>,
        search_query: &str,
        question: &str,
    ) -> Result<(String, Vec<SearchHit>), EngineError> {
        let backend = self.services.collaborators.require_web_search()?;
        let hits = backend.search(search_query, SEARCH_LIMIT).await?;
        let prompt = build_prompt(question, &hits);
        let text = generate(&self.services, ctx, &self.services.prompts.search, &prompt).await?;
        Ok((text, hits))
    }
}

/// Formats hits into the `<results>` block of the prompt.
fn build_prompt(question: &str, hits: &[SearchHit]) -> String {
    let mut prompt = String::from("<results>\n");
    if hits.is_empty() {
        prompt.push_str("(no results)\n");
    }
    for (i, hit) in hits.iter().enumerate() {
        let _ = write!(
            prompt,
            "<result n=\"{n}\" url=\"{url}\">\n<title>{title}</title>\n{snippet}\n</result>\n",
            n = i + 1,
            url = hit.url,
            title = hit.title,
            snippet = hit.snippet,
        );
    }
    let _ = write!(prompt, "</results>\n\n<question>{question}</question>");
    prompt
}

#[async_trait]
impl StrategyHandler for SearchStrategy {
    fn mode(&self) -> Mode {
        Mode::Search
    }

    async fn process(&self, ctx: &mut StrategyContext<'_>) -> Result<String, EngineError> {
        let query = ctx.request.query().to_string();
        ctx.progress("search", "searching the web").await;
        let (text, hits) = self.answer(ctx, &query, &query).await?;
        ctx.set_metadata(
            "sources",
            json!(hits.iter().map(|h| &h.url).collect::<Vec<_>>()),
        );
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::core::{EventRecorder, Request};
    use crate::strategy::tests::services;
    use crate::strategy::{Collaborators, WebSearch};
    use crate::test_support::ScriptedProvider;

    /// Backend returning one hit per query; queries containing `fail` error.
    pub(crate) struct EchoSearch;

    #[async_trait]
    impl WebSearch for EchoSearch {
        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchHit>, EngineError> {
            if query.contains("fail") {
                return Err(EngineError::Collaborator {
                    collaborator: "web_search",
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(vec![SearchHit {
                title: format!("About {query}"),
                url: format!("https://example.com/{}", query.replace(' ', "-")),
                snippet: format!("Snippet for {query}"),
            }])
        }

        async fn fetch(&self, url: &str) -> Result<String, EngineError> {
            Ok(format!("page at {url}"))
        }
    }

    #[tokio::test]
    async fn test_search_cites_hits() {
        let provider = Arc::new(ScriptedProvider::new("mock"));
        let collaborators = Collaborators::none().with_web_search(Arc::new(EchoSearch));
        let strategy = SearchStrategy::new(services(&provider, collaborators));
        let request = Request::new("rust 2024 edition");
        let mut ctx = StrategyContext::new(&request, Mode::Search, EventRecorder::new());

        assert!(strategy.process(&mut ctx).await.is_ok());
        assert!(provider.prompt(0).contains(r#"url="https://example.com/rust-2024-edition""#));
        assert_eq!(
            ctx.metadata["sources"],
            json!(["https://example.com/rust-2024-edition"])
        );
        assert_eq!(ctx.events.events().len(), 1);
    }

    #[tokio::test]
    async fn test_search_backend_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::new("mock"));
        let collaborators = Collaborators::none().with_web_search(Arc::new(EchoSearch));
        let strategy = SearchStrategy::new(services(&provider, collaborators));
        let request = Request::new("fail please");
        let mut ctx = StrategyContext::new(&request, Mode::Search, EventRecorder::new());

        assert!(matches!(
            strategy.process(&mut ctx).await,
            Err(EngineError::Collaborator { .. })
        ));
        assert_eq!(provider.calls(), 0);
    }
}
