//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// The type is `Clone` because a single producer result is shared by every
/// caller waiting on the same in-flight fetch.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Key rejected by its validation rule
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Construction options out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// `get` called for a key without a registered task
    #[error("Task must be defined for the \"{0}\" key")]
    TaskNotRegistered(String),

    /// The registered producer returned an error
    #[error("Task of the \"{key}\" key failed: {error}")]
    TaskExecution {
        key: String,
        error: Arc<anyhow::Error>,
    },

    /// The producer panicked or its task was cancelled before settling
    #[error("Task of the \"{0}\" key was aborted before settling")]
    TaskAborted(String),
}

impl CacheError {
    /// Wraps a producer failure for `key`.
    pub fn task_execution(key: impl Into<String>, error: anyhow::Error) -> Self {
        CacheError::TaskExecution {
            key: key.into(),
            error: Arc::new(error),
        }
    }

    /// Returns the producer's own error, if this is a task execution failure.
    pub fn task_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::TaskExecution { error, .. } => Some(error),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
