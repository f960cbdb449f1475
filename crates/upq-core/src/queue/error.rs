//! Errors raised when building a queue. Transfer failures are job data, not errors.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid queue config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("queue must be created inside a tokio runtime")]
    NoRuntime,
}
