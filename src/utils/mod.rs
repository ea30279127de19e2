//! Utility modules.

pub mod retry;

pub use retry::{Retryable, RetryConfig, with_retry};
