//! Plan recitation.
//!
//! Keeps a checklist-style plan for one turn and re-injects it at the top
//! of each prompt so the model stays anchored to it.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::Mode;

/// Longest plan text recited, in characters.
const MAX_RECITED_CHARS: usize = 2000;

/// Checklist lines: `- [ ] x`, `* [x] x`, `1. x`, `2) x`.
static CHECKLIST_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s*\[[ xX]\]|\d+[.)])\s+\S").ok()
});

/// Per-turn plan with recitation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRecitation {
    plan: String,
}

impl PlanRecitation {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current plan text.
    #[must_use]
    pub fn plan(&self) -> &str {
        &self.plan
    }

    /// Replaces the plan wholesale.
    pub fn reset(&mut self, plan: impl Into<String>) {
        self.plan = plan.into();
    }

    /// Seeds the plan from the query and mode and returns it.
    pub fn create_initial_plan(&mut self, query: &str, mode: Mode) -> &str {
        let steps: &[&str] = match mode {
            Mode::Auto | Mode::Chat => &["Answer the question directly"],
            Mode::Knowledge => &[
                "Retrieve relevant documents",
                "Answer using only the retrieved documents",
            ],
            Mode::Search => &["Search the web", "Summarize findings with sources"],
            Mode::Code => &[
                "Write or inspect the code",
                "Run or analyze it",
                "Explain the result",
            ],
            Mode::Thinking => &[
                "Break the problem into parts",
                "Reason through each part",
                "Weigh alternatives and conclude",
            ],
            Mode::DeepResearch => &[
                "Draft a research plan",
                "Derive search sub-queries",
                "Run each sub-query",
                "Synthesize a report",
            ],
        };

        let mut plan = format!("Goal: {}\n- [ ] Understand the request\n", query.trim());
        for step in steps {
            plan.push_str("- [ ] ");
            plan.push_str(step);
            plan.push('\n');
        }
        plan.push_str("- [ ] Check the answer against the goal");
        self.plan = plan;
        &self.plan
    }

    /// Returns the plan wrapped in a delimited block, or an empty string
    /// when there is no plan.
    #[must_use]
    pub fn build_recitation_prefix(&self) -> String {
        let plan = self.plan.trim();
        if plan.is_empty() {
            return String::new();
        }
        let recited: String = plan.chars().take(MAX_RECITED_CHARS).collect();
        format!("<current_plan>\n{recited}\n</current_plan>\n\n")
    }

    /// Replaces the plan with the checklist lines found in `text`.
    ///
    /// Returns `true` if the plan changed. Text without checklist lines
    /// leaves the plan untouched.
    pub fn update_from_output(&mut self, text: &str) -> bool {
        let Some(re) = CHECKLIST_LINE.as_ref() else {
            return false;
        };
        let lines: Vec<&str> = text
            .lines()
            .filter(|l| re.is_match(l))
            .map(str::trim_end)
            .collect();
        if lines.is_empty() {
            return false;
        }
        self.plan = lines.join("\n");
        true
    }
}
