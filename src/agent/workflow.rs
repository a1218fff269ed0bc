//! Deep-research workflow state machine.
//!
//! `Pending → Running → Completed | Failed`. Terminal states are final,
//! and the step history is never discarded, including on failure.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EngineError;

/// Workflow status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Created, not started.
    #[default]
    Pending,
    /// Executing steps.
    Running,
    /// Report produced.
    Completed,
    /// Stopped by an unrecoverable step failure.
    Failed,
}

impl WorkflowStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step name (`plan`, `decompose`, `search`, `synthesize`).
    pub name: String,
    /// Step input.
    pub input: String,
    /// Step output; empty when the step failed.
    pub output: String,
    /// Failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the step's failure was absorbed by a fallback.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Persisted record of one deep-research execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Current status.
    pub status: WorkflowStatus,
    /// Steps in execution order.
    pub steps: Vec<WorkflowStep>,
    /// Archive path of the final report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    /// Failure that moved the workflow to `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowState {
    /// A new pending workflow.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn transition(&mut self, to: WorkflowStatus) -> Result<(), EngineError> {
        let allowed = matches!(
            (self.status, to),
            (WorkflowStatus::Pending, WorkflowStatus::Running)
                | (WorkflowStatus::Running, WorkflowStatus::Completed | WorkflowStatus::Failed)
        );
        if !allowed {
            return Err(EngineError::InvalidTransition {
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        info!(from = %self.status, to = %to, "workflow transition");
        self.status = to;
        Ok(())
    }

    /// `Pending → Running`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] from any other state.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.transition(WorkflowStatus::Running)
    }

    /// `Running → Completed`, recording the report path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] unless running.
    pub fn complete(&mut self, report_path: Option<String>) -> Result<(), EngineError> {
        self.transition(WorkflowStatus::Completed)?;
        self.report_path = report_path;
        Ok(())
    }

    /// `Running → Failed`, recording the cause.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] unless running.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), EngineError> {
        self.transition(WorkflowStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Appends a successful step.
    pub fn record(&mut self, name: &str, input: impl Into<String>, output: impl Into<String>) {
        self.steps.push(WorkflowStep {
            name: name.to_string(),
            input: input.into(),
            output: output.into(),
            error: None,
            degraded: false,
        });
    }

    /// Appends a failed step. `degraded` marks a failure absorbed by a fallback.
    pub fn record_failure(
        &mut self,
        name: &str,
        input: impl Into<String>,
        error: impl Into<String>,
        degraded: bool,
    ) {
        self.steps.push(WorkflowStep {
            name: name.to_string(),
            input: input.into(),
            output: String::new(),
            error: Some(error.into()),
            degraded,
        });
    }

    /// Serializes the state for response metadata.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = WorkflowState::new();
        assert_eq!(state.status, WorkflowStatus::Pending);
        assert!(state.start().is_ok());
        state.record("plan", "q", "- [ ] a");
        assert!(state.complete(Some("research/t/report.md".to_string())).is_ok());

        assert_eq!(state.status, WorkflowStatus::Completed);
        assert_eq!(state.steps.len(), 1);
        assert_eq!(state.report_path.as_deref(), Some("research/t/report.md"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut state = WorkflowState::new();
        assert!(state.start().is_ok());
        assert!(state.fail("boom").is_ok());

        assert!(state.start().is_err());
        assert!(state.complete(None).is_err());
        assert!(state.fail("again").is_err());
        assert_eq!(state.status, WorkflowStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_cannot_complete_before_start() {
        let mut state = WorkflowState::new();
        assert!(matches!(
            state.complete(None),
            Err(EngineError::InvalidTransition { from: "PENDING", to: "COMPLETED" })
        ));
    }

    #[test]
    fn test_failure_preserves_steps() {
        let mut state = WorkflowState::new();
        assert!(state.start().is_ok());
        state.record("plan", "q", "p");
        state.record_failure("search", "sq", "timeout", false);
        assert!(state.fail("all searches failed").is_ok());
        assert_eq!(state.steps.len(), 2);
        assert_eq!(state.steps[1].error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_to_value_shape() {
        let mut state = WorkflowState::new();
        state.record_failure("decompose", "q", "bad json", true);
        let value = state.to_value();
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["steps"][0]["degraded"], true);
    }
}
