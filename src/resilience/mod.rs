//! Resilience layer: retry policy with exponential backoff and jitter.

mod retry;

pub use retry::{RetryConfig, RetryPolicy};
