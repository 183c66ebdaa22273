//! The unit of work walked through the chain.
//!
//! A [`Request`] carries an immutable type tag plus two mutable fields, the
//! handled flag and the terminal error. Both live behind one per-request
//! lock, so the dispatch worker and any caller inspecting the request never
//! observe a torn pair.
//!
//! # Example
//!
//! ```
//! use handler_chain::{ChainError, Request, RequestOutcome};
//!
//! let request = Request::new("log");
//! assert_eq!(request.outcome(), RequestOutcome::Pending);
//!
//! request.set_error(ChainError::HandlerNotFound);
//! assert_eq!(request.error(), Some(ChainError::HandlerNotFound));
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ChainError;

/// Mutable part of a request.
#[derive(Debug, Default)]
struct RequestState {
    handled: bool,
    error: Option<ChainError>,
}

/// Snapshot of a request's terminal state, read under a single lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// No handler has claimed the request and no error was recorded.
    Pending,
    /// A handler claimed the request.
    Handled,
    /// The dispatch recorded a terminal error.
    Failed(ChainError),
}

/// A request dispatched through the handler chain.
///
/// Shared between the caller and the dispatch worker as `Arc<Request>`.
#[derive(Debug)]
pub struct Request {
    request_type: String,
    state: Mutex<RequestState>,
}

impl Request {
    /// Create a new request with the given type tag.
    pub fn new(request_type: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            state: Mutex::new(RequestState::default()),
        }
    }

    /// Create a new request already wrapped for sharing with a dispatch.
    pub fn shared(request_type: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(request_type))
    }

    /// Get the type tag.
    #[inline]
    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    /// Whether a handler has claimed this request.
    pub fn is_handled(&self) -> bool {
        self.state().handled
    }

    /// Set the handled flag.
    pub fn set_handled(&self, handled: bool) {
        self.state().handled = handled;
    }

    /// Get the recorded terminal error, if any.
    pub fn error(&self) -> Option<ChainError> {
        self.state().error.clone()
    }

    /// Record a terminal error. The last writer wins.
    pub fn set_error(&self, error: ChainError) {
        self.state().error = Some(error);
    }

    /// Read flag and error together.
    ///
    /// A recorded error takes precedence over the handled flag.
    pub fn outcome(&self) -> RequestOutcome {
        let state = self.state();
        match (&state.error, state.handled) {
            (Some(error), _) => RequestOutcome::Failed(error.clone()),
            (None, true) => RequestOutcome::Handled,
            (None, false) => RequestOutcome::Pending,
        }
    }

    // A panic while holding the lock cannot leave the two plain fields
    // inconsistent, so poisoning is ignored.
    fn state(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
