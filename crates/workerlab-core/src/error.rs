//! Harness and substrate error types.
//!
//! Only the harness errors are surfaced to callers as exceptional
//! conditions. Misbehaving submissions never produce one of these; they
//! become [`Failure`](crate::model::Failure) data on the execution result.

use thiserror::Error;

/// Errors that abort a run before any verdict is produced.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The submission was empty, oversized, or otherwise unusable.
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    /// The isolation substrate could not allocate an execution context.
    #[error("failed to provision sandbox: {0}")]
    ProvisionFailed(String),
}

impl HarnessError {
    /// Returns `true` if the caller may retry the whole run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HarnessError::ProvisionFailed(_))
    }
}

/// Errors raised by an isolation substrate while allocating a context.
#[derive(Debug, Error)]
pub enum SubstrateError {
    /// The substrate is out of capacity (processes, memory, descriptors).
    #[error("substrate exhausted: {0}")]
    Exhausted(String),

    /// The substrate is missing or misconfigured.
    #[error("substrate unavailable: {0}")]
    Unavailable(String),

    /// An I/O error while preparing the context.
    #[error("substrate I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubstrateError {
    /// Returns `true` if a single immediate retry may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SubstrateError::Unavailable(_))
    }
}

/// A failure raised by the sandboxed entrypoint itself.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EntrypointError {
    pub message: String,
}

impl EntrypointError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
