//! Error types for handler-chain.

use std::time::Duration;

use thiserror::Error;

/// Terminal failure of a dispatch, or of an operation on the chain manager.
///
/// Errors are `Clone` because the same value is recorded on the
/// [`Request`](crate::Request) and delivered to the completion channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The request's type tag failed validation (e.g. it is empty).
    #[error("Invalid request")]
    InvalidRequest,

    /// The chain is empty, or no handler claimed the request.
    #[error("No handler found for request")]
    HandlerNotFound,

    /// A handler explicitly rejected the request.
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// The caller-side deadline elapsed before the outcome arrived.
    #[error("Dispatch timed out after {0:?}")]
    Timeout(Duration),

    /// The job queue is gone; the job was not scheduled or its outcome was lost.
    #[error("Chain manager closed")]
    ManagerClosed,
}

/// Result type alias using ChainError.
pub type Result<T> = std::result::Result<T, ChainError>;
