//! Context engineering.
//!
//! Independent helpers that shape what is sent to the model on each turn:
//!
//! - [`AppendOnlyContext`]: immutable history with prefix archiving
//! - [`PlanRecitation`]: checklist plan re-injected into prompts
//! - [`ErrorPreservation`]: failed attempts fed back into retries
//! - [`InstructionRandomizer`]: varied instruction wrappers
//! - [`tool_mask`]: per-mode tool availability

pub mod append_only;
pub mod archive;
pub mod error_preservation;
pub mod plan;
pub mod randomizer;
pub mod tool_mask;

pub use append_only::{AppendOnlyContext, ContextEntry};
pub use archive::{ArchiveSink, FsArchive, MemoryArchive};
pub use error_preservation::ErrorPreservation;
pub use plan::PlanRecitation;
pub use randomizer::InstructionRandomizer;
pub use tool_mask::{allowed_for, allowed_tools, apply_mask};
