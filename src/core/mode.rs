//! Processing modes and cognitive levels.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Processing mode requested by the caller or resolved by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Let the router decide.
    Auto,
    /// Direct answer.
    Chat,
    /// Retrieval-augmented answer.
    Knowledge,
    /// Web search answer.
    Search,
    /// Code execution and analysis.
    Code,
    /// Deliberative reasoning.
    Thinking,
    /// Multi-step research workflow.
    DeepResearch,
}

impl Mode {
    /// Every concrete (non-`Auto`) mode.
    pub const CONCRETE: [Self; 6] = [
        Self::Chat,
        Self::Knowledge,
        Self::Search,
        Self::Code,
        Self::Thinking,
        Self::DeepResearch,
    ];

    /// Returns the wire/string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Chat => "chat",
            Self::Knowledge => "knowledge",
            Self::Search => "search",
            Self::Code => "code",
            Self::Thinking => "thinking",
            Self::DeepResearch => "deep_research",
        }
    }

    /// Fixed cognitive level for a concrete mode.
    ///
    /// `Auto` has no level of its own; it maps to `Fast` until resolved.
    #[must_use]
    pub const fn cognitive_level(self) -> CognitiveLevel {
        match self {
            Self::Auto | Self::Chat => CognitiveLevel::Fast,
            Self::Knowledge | Self::Search | Self::Code => CognitiveLevel::Analytic,
            Self::Thinking | Self::DeepResearch => CognitiveLevel::Agentic,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(Self::Auto),
            "chat" => Ok(Self::Chat),
            "knowledge" => Ok(Self::Knowledge),
            "search" => Ok(Self::Search),
            "code" => Ok(Self::Code),
            "thinking" => Ok(Self::Thinking),
            "deep_research" | "research" => Ok(Self::DeepResearch),
            other => Err(EngineError::invalid_request(format!("unknown mode: {other}"))),
        }
    }
}

/// Coarse effort classification attached to a resolved mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CognitiveLevel {
    /// Single cheap call.
    Fast,
    /// Grounded or tool-assisted answer.
    Analytic,
    /// Multi-step deliberation.
    Agentic,
}

impl CognitiveLevel {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Analytic => "analytic",
            Self::Agentic => "agentic",
        }
    }
}

impl std::fmt::Display for CognitiveLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
