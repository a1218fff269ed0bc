//! Language-model plumbing.
//!
//! Strategies and agents only ever see [`LlmProvider`] and the
//! provider-agnostic messages in [`message`]; vendor SDKs stay behind the
//! adapters in [`providers`].

pub mod client;
pub mod message;
pub mod provider;
pub mod providers;

pub use client::{create_chain, create_provider};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use provider::{ChunkStream, LlmProvider};
