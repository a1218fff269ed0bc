//! Deep-research runtime.
//!
//! Coordinates the research pipeline: plan → decompose into sub-queries →
//! search each sub-query → synthesize a report. Steps run strictly in
//! sequence and every step is recorded in a [`WorkflowState`], which is
//! persisted into the response metadata whether the workflow completes
//! or fails.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use super::decomposer::DecomposerAgent;
use super::finding::{Finding, SubQuery};
use super::primary::PlannerAgent;
use super::prompt::{build_decomposer_prompt, build_sub_query_prompt, build_synthesizer_prompt};
use super::synthesizer::SynthesizerAgent;
use super::traits::Agent;
use super::workflow::WorkflowState;
use crate::context::{AppendOnlyContext, PlanRecitation};
use crate::core::Mode;
use crate::error::EngineError;
use crate::llm::message::Role;
use crate::strategy::{
    SearchStrategy, Services, StrategyContext, StrategyHandler, with_quality_retry,
};

/// Runs the deep-research workflow.
#[derive(Debug)]
pub struct ResearchRuntime {
    services: Arc<Services>,
    search: SearchStrategy,
}

/// Mutable state of one run.
///
/// `context` accumulates the question, plan and findings; each sub-query
/// search is shown its live entries.
struct Run {
    state: WorkflowState,
    plan: PlanRecitation,
    context: AppendOnlyContext,
}

impl ResearchRuntime {
    /// Creates a runtime over shared services.
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            search: SearchStrategy::new(Arc::clone(&services)),
            services,
        }
    }

    /// Archive path of the report for `trace_id`.
    #[must_use]
    pub fn report_path(trace_id: &str) -> String {
        format!("research/{trace_id}/report.md")
    }

    /// Executes the full pipeline for the request in `ctx`.
    ///
    /// # Steps
    ///
    /// 1. Plan via [`PlannerAgent`]; the plan seeds plan recitation
    /// 2. Decompose into sub-queries via [`DecomposerAgent`]; a parse
    ///    failure degrades to a single sub-query equal to the question
    /// 3. Search each sub-query in priority order; a failed sub-query is
    ///    recorded and skipped, but if all fail the workflow fails
    /// 4. Synthesize the report and write it to the archive
    async fn execute(
        &self,
        ctx: &mut StrategyContext<'_>,
        run: &mut Run,
    ) -> Result<String, EngineError> {
        let question = ctx.request.query().to_string();
        run.state.start()?;
        run.context.append(Role::User, question.as_str());

        // Step 1: plan
        ctx.progress("plan", "drafting research plan").await;
        run.plan.create_initial_plan(&question, Mode::DeepResearch);
        let planner = PlannerAgent::new(self.services.prompts.planner.clone());
        let (plan_text, response) = planner.plan(&self.services.client, &question).await.map_err(
            |e| {
                run.state
                    .record_failure("plan", question.as_str(), e.to_string(), false);
                e
            },
        )?;
        ctx.record_call(response.usage);
        if !run.plan.update_from_output(&plan_text) {
            warn!("planner returned no checklist; keeping seeded plan");
        }
        run.state.record("plan", question.as_str(), run.plan.plan());
        run.context.append(Role::Assistant, run.plan.plan());

        // Step 2: sub-queries
        let sub_queries = self.decompose(ctx, run, &question).await?;
        ctx.set_metadata("sub_queries", json!(sub_queries));

        // Step 3: search
        let findings = self.search_all(ctx, run, &question, &sub_queries).await?;

        // Step 4: synthesize
        ctx.progress("synthesize", "writing report").await;
        let report = self.synthesize(ctx, run, &question, &findings).await?;
        let report_path = self.archive_report(ctx.request.trace_id(), &report).await;
        if let Some(path) = &report_path {
            ctx.set_metadata("report_path", json!(path));
        }
        run.state.complete(report_path)?;
        Ok(report)
    }

    async fn decompose(
        &self,
        ctx: &mut StrategyContext<'_>,
        run: &mut Run,
        question: &str,
    ) -> Result<Vec<SubQuery>, EngineError> {
        let max = self.services.settings.max_sub_queries;
        ctx.progress("decompose", "deriving search sub-queries").await;
        let decomposer = DecomposerAgent::new(self.services.prompts.decomposer.clone());
        let prompt = build_decomposer_prompt(&run.plan.build_recitation_prefix(), question, max);

        match decomposer
            .execute_and_parse(&self.services.client, &prompt, max)
            .await
        {
            Ok((sub_queries, response)) => {
                ctx.record_call(response.usage);
                let listed: Vec<&str> = sub_queries.iter().map(|s| s.query.as_str()).collect();
                run.state.record("decompose", question, listed.join("\n"));
                Ok(sub_queries)
            }
            Err(e @ EngineError::ResponseParse { .. }) => {
                warn!(error = %e, "sub-query parsing failed; searching the question itself");
                ctx.provider_calls = ctx.provider_calls.saturating_add(1);
                run.state
                    .record_failure("decompose", question, e.to_string(), true);
                Ok(vec![SubQuery::fallback(question)])
            }
            Err(e) => {
                run.state
                    .record_failure("decompose", question, e.to_string(), false);
                Err(e)
            }
        }
    }

    async fn search_all(
        &self,
        ctx: &mut StrategyContext<'_>,
        run: &mut Run,
        question: &str,
        sub_queries: &[SubQuery],
    ) -> Result<Vec<Finding>, EngineError> {
        let total = sub_queries.len();
        let mut findings = Vec::with_capacity(total);
        let mut last_error = None;

        for (i, sub_query) in sub_queries.iter().enumerate() {
            ctx.progress(
                "search",
                format!("[{}/{total}] {}", i + 1, sub_query.query),
            )
            .await;
            let prompt = build_sub_query_prompt(question, sub_query, &run.context.get_messages());

            match self.search.answer(ctx, &sub_query.query, &prompt).await {
                Ok((answer, hits)) => {
                    run.state.record("search", sub_query.query.as_str(), answer.as_str());
                    let metadata = json!({
                        "sub_query": sub_query.query,
                        "sources": hits.iter().map(|h| &h.url).collect::<Vec<_>>(),
                    });
                    run.context.append_with_metadata(
                        Role::Assistant,
                        answer.as_str(),
                        metadata.as_object().cloned().unwrap_or_default(),
                    );
                    findings.push(Finding::success(sub_query.clone(), answer));
                }
                Err(e) => {
                    warn!(sub_query = %sub_query.query, error = %e, "sub-query failed");
                    run.state
                        .record_failure("search", sub_query.query.as_str(), e.to_string(), false);
                    findings.push(Finding::failure(sub_query.clone(), e.to_string()));
                    last_error = Some(e);
                }
            }

            self.maybe_compress(run).await;
        }

        match last_error {
            Some(e) if findings.iter().all(|f| !f.is_success()) => Err(e),
            _ => Ok(findings),
        }
    }

    /// Archives the research context once it outgrows the threshold.
    async fn maybe_compress(&self, run: &mut Run) {
        let settings = self.services.settings;
        if run.context.len() <= settings.context_compress_threshold {
            return;
        }
        if let Err(e) = run
            .context
            .compress(self.services.archive.as_ref(), settings.context_keep_last)
            .await
        {
            warn!(error = %e, "context compression failed; keeping full context");
        }
    }

    async fn synthesize(
        &self,
        ctx: &mut StrategyContext<'_>,
        run: &mut Run,
        question: &str,
        findings: &[Finding],
    ) -> Result<String, EngineError> {
        let agent = SynthesizerAgent::new(
            self.services.prompts.synthesizer.clone(),
            ctx.request.sampling().max_tokens,
        );
        let prompt = build_synthesizer_prompt(&run.plan.build_recitation_prefix(), question, findings);
        let client = &self.services.client;

        let result = with_quality_retry(
            ctx,
            self.services.settings.quality_retries,
            &prompt,
            |p| {
                let agent = &agent;
                async move {
                    let response = agent.execute(client, &p).await?;
                    Ok((response.content, response.usage))
                }
            },
        )
        .await
        .and_then(|report| {
            if report.trim().is_empty() {
                Err(EngineError::Workflow {
                    step: "synthesize",
                    message: "model returned an empty report".to_string(),
                })
            } else {
                Ok(report)
            }
        });

        match result {
            Ok(report) => {
                run.state.record("synthesize", question, report.as_str());
                run.context.append(Role::Assistant, report.as_str());
                Ok(report)
            }
            Err(e) => {
                run.state
                    .record_failure("synthesize", question, e.to_string(), false);
                Err(e)
            }
        }
    }

    /// Writes the report to the archive. Returns its path, or `None` when
    /// the write failed.
    async fn archive_report(&self, trace_id: &str, report: &str) -> Option<String> {
        let path = Self::report_path(trace_id);
        match self.services.archive.write(&path, report).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path, error = %e, "failed to archive research report");
                None
            }
        }
    }
}

#[async_trait]
impl StrategyHandler for ResearchRuntime {
    fn mode(&self) -> Mode {
        Mode::DeepResearch
    }

    async fn process(&self, ctx: &mut StrategyContext<'_>) -> Result<String, EngineError> {
        let mut run = Run {
            state: WorkflowState::new(),
            plan: PlanRecitation::new(),
            context: AppendOnlyContext::new(format!("research/{}/context", ctx.request.trace_id())),
        };

        let result = self.execute(ctx, &mut run).await;
        if let Err(e) = &result {
            if !run.state.status.is_terminal()
                && let Err(transition) = run.state.fail(e.to_string())
            {
                warn!(error = %transition, "could not mark workflow failed");
            }
            warn!(error = %e, "research workflow failed");
        } else {
            info!(steps = run.state.steps.len(), "research workflow completed");
        }
        ctx.set_metadata("workflow", run.state.to_value());
        result
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::workflow::WorkflowStatus;
    use crate::context::{ArchiveSink, MemoryArchive};
    use crate::core::{EventRecorder, Request};
    use crate::strategy::search::tests::EchoSearch;
    use crate::strategy::{Collaborators, StrategySettings};
    use crate::test_support::{ScriptedProvider, client};

    const REPORT: &str = "# Report\n\nRust async runtimes differ mainly in scheduling.";

    fn runtime(
        provider: &Arc<ScriptedProvider>,
        archive: &Arc<MemoryArchive>,
        settings: StrategySettings,
    ) -> ResearchRuntime {
        ResearchRuntime::new(Arc::new(Services {
            client: client(provider),
            prompts: crate::agent::prompt::PromptSet::defaults(),
            collaborators: Collaborators::none().with_web_search(Arc::new(EchoSearch)),
            archive: Arc::clone(archive) as Arc<dyn ArchiveSink>,
            settings,
        }))
    }

    fn workflow(ctx: &StrategyContext<'_>) -> WorkflowState {
        serde_json::from_value(ctx.metadata["workflow"].clone())
            .unwrap_or_else(|e| panic!("bad workflow metadata: {e}"))
    }

    #[tokio::test]
    async fn test_research_completes() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .reply("- [ ] Survey runtimes\n- [ ] Compare schedulers")
                .reply(
                    r#"<subqueries>[
                        {"query": "tokio scheduler", "goal": "how tokio schedules", "priority": "low"},
                        {"query": "async-std status", "goal": "maintenance", "priority": "high"}
                    ]</subqueries>"#,
                )
                .reply("async-std is discontinued in favour of smol.")
                .reply("Tokio uses a work-stealing multi-threaded scheduler.")
                .reply(REPORT),
        );
        let archive = Arc::new(MemoryArchive::new());
        let runtime = runtime(&provider, &archive, StrategySettings::default());
        let request = Request::new("How do Rust async runtimes compare?").with_trace_id("t1");
        let mut ctx = StrategyContext::new(&request, Mode::DeepResearch, EventRecorder::new());

        let report = runtime.process(&mut ctx).await;

        assert_eq!(report.ok().as_deref(), Some(REPORT));
        assert_eq!(provider.calls(), 5);
        // high priority first
        assert!(provider.prompt(2).contains("async-std status"));
        // plan recitation is prepended to decomposition and synthesis
        assert!(provider.prompt(1).starts_with("<current_plan>\n- [ ] Survey runtimes"));
        assert!(provider.prompt(4).starts_with("<current_plan>"));
        // the second search sees the first finding
        assert!(provider.prompt(3).contains("<research_log>"));
        assert!(provider.prompt(3).contains("async-std is discontinued in favour of smol."));

        let state = workflow(&ctx);
        assert_eq!(state.status, WorkflowStatus::Completed);
        let names: Vec<&str> = state.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["plan", "decompose", "search", "search", "synthesize"]);
        assert_eq!(state.report_path.as_deref(), Some("research/t1/report.md"));
        assert_eq!(
            archive.read("research/t1/report.md").await.ok().flatten().as_deref(),
            Some(REPORT)
        );
    }

    #[tokio::test]
    async fn test_sub_query_parse_failure_degrades() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .reply("- [ ] Look it up")
                .reply("Sorry, I can only answer in prose.")
                .reply("Found a detailed answer to the question.")
                .reply(REPORT),
        );
        let archive = Arc::new(MemoryArchive::new());
        let runtime = runtime(&provider, &archive, StrategySettings::default());
        let request = Request::new("What is the capital of Australia?");
        let mut ctx = StrategyContext::new(&request, Mode::DeepResearch, EventRecorder::new());

        assert!(runtime.process(&mut ctx).await.is_ok());

        let state = workflow(&ctx);
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert!(state.steps[1].degraded);
        assert_eq!(state.steps[2].input, "What is the capital of Australia?");
    }

    #[tokio::test]
    async fn test_one_failed_sub_query_is_skipped() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .reply("- [ ] a")
                .reply(r#"<subqueries>[{"query": "will fail"}, {"query": "works fine"}]</subqueries>"#)
                .reply("The working sub-query produced this answer.")
                .reply(REPORT),
        );
        let archive = Arc::new(MemoryArchive::new());
        let runtime = runtime(&provider, &archive, StrategySettings::default());
        let request = Request::new("q");
        let mut ctx = StrategyContext::new(&request, Mode::DeepResearch, EventRecorder::new());

        assert!(runtime.process(&mut ctx).await.is_ok());
        let state = workflow(&ctx);
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert!(state.steps[2].error.is_some());
        assert!(provider.prompt(3).contains(r#"status="failed""#));
    }

    #[tokio::test]
    async fn test_all_sub_queries_failing_fails_workflow() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .reply("- [ ] a")
                .reply(r#"<subqueries>[{"query": "fail one"}, {"query": "fail two"}]</subqueries>"#),
        );
        let archive = Arc::new(MemoryArchive::new());
        let runtime = runtime(&provider, &archive, StrategySettings::default());
        let request = Request::new("q");
        let mut ctx = StrategyContext::new(&request, Mode::DeepResearch, EventRecorder::new());

        assert!(matches!(
            runtime.process(&mut ctx).await,
            Err(EngineError::Collaborator { .. })
        ));
        let state = workflow(&ctx);
        assert_eq!(state.status, WorkflowStatus::Failed);
        assert_eq!(state.steps.len(), 4);
        assert!(state.report_path.is_none());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_planner_failure_fails_workflow() {
        let provider = Arc::new(ScriptedProvider::new("mock").fail(EngineError::invalid_request(
            "bad argument",
        )));
        let archive = Arc::new(MemoryArchive::new());
        let runtime = runtime(&provider, &archive, StrategySettings::default());
        let request = Request::new("q");
        let mut ctx = StrategyContext::new(&request, Mode::DeepResearch, EventRecorder::new());

        assert!(runtime.process(&mut ctx).await.is_err());
        let state = workflow(&ctx);
        assert_eq!(state.status, WorkflowStatus::Failed);
        assert_eq!(state.steps.len(), 1);
        assert_eq!(state.steps[0].name, "plan");
    }

    #[tokio::test]
    async fn test_context_is_compressed_to_archive() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .reply("- [ ] a")
                .reply(r#"<subqueries>[{"query": "one"}, {"query": "two"}, {"query": "three"}]</subqueries>"#),
        );
        let archive = Arc::new(MemoryArchive::new());
        let settings = StrategySettings {
            context_compress_threshold: 3,
            context_keep_last: 1,
            ..StrategySettings::default()
        };
        let runtime = runtime(&provider, &archive, settings);
        let request = Request::new("q").with_trace_id("t2");
        let mut ctx = StrategyContext::new(&request, Mode::DeepResearch, EventRecorder::new());

        assert!(runtime.process(&mut ctx).await.is_ok());
        assert!(
            archive
                .read("research/t2/context/archive-0000.json")
                .await
                .ok()
                .flatten()
                .is_some()
        );
        // after compression the third search sees the archive reference
        assert!(
            provider
                .prompt(4)
                .contains("archived at research/t2/context/archive-0000.json")
        );
    }
}
