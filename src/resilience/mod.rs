//! Failure handling for provider calls.
//!
//! - [`classify`]: maps errors to categories and retry verdicts
//! - [`retry`]: exponential backoff within one provider
//! - [`fallback`]: ordered fallback across providers

pub mod classify;
pub mod fallback;
pub mod retry;

pub use classify::{classify, classify_message, is_retryable};
pub use fallback::FallbackClient;
pub use retry::{RetryPolicy, retry_with_backoff};
