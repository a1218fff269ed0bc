//! Instruction randomizer.
//!
//! Wraps an instruction in one of several phrasings so identical prompts
//! don't share an exact prefix at the provider.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

const PREFIXES: &[&str] = &[
    "Instruction:\n",
    "Please handle the following task.\n\n",
    "Task:\n",
    "Here is what I need:\n",
    "Request:\n",
];

const SUFFIXES: &[&str] = &[
    "\n\nRespond clearly.",
    "\n\nBe precise.",
    "\n\nAnswer thoroughly but concisely.",
    "\n\nThank you.",
];

/// Randomly wraps instructions.
#[derive(Debug, Clone)]
pub struct InstructionRandomizer {
    rng: StdRng,
}

impl Default for InstructionRandomizer {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionRandomizer {
    /// Randomizer seeded from the OS.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic randomizer.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns `text` embedded verbatim between a random prefix and suffix.
    pub fn wrap_instruction(&mut self, text: &str) -> String {
        let prefix = PREFIXES.choose(&mut self.rng).copied().unwrap_or_default();
        let suffix = SUFFIXES.choose(&mut self.rng).copied().unwrap_or_default();
        format!("{prefix}{text}{suffix}")
    }
}
