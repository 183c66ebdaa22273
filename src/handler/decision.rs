//! The decision protocol every handler implements.
//!
//! A handler inspects a [`Request`] and answers with a [`HandledResult`].
//! It never advances the chain itself; the walk in
//! [`HandlerChain`](super::HandlerChain) owns traversal.
//!
//! # Example
//!
//! ```
//! use handler_chain::handler::{FnHandler, HandledResult, Handler};
//! use handler_chain::Request;
//!
//! let ping = FnHandler::new("ping", |request: &Request| {
//!     if request.request_type() == "ping" {
//!         HandledResult::Handled
//!     } else {
//!         HandledResult::NotHandled
//!     }
//! });
//!
//! assert_eq!(ping.name(), "ping");
//! assert_eq!(ping.decide(&Request::new("ping")), HandledResult::Handled);
//! ```

use std::sync::Arc;

use crate::error::ChainError;
use crate::request::Request;

/// Outcome of a single handler's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandledResult {
    /// Pass the request on to the successor.
    NotHandled,
    /// Claim the request; the walk stops successfully.
    Handled,
    /// Reject the request; the walk stops with this error.
    Failed(ChainError),
}

impl HandledResult {
    /// Whether the handler claimed the request.
    #[inline]
    pub fn is_handled(&self) -> bool {
        matches!(self, HandledResult::Handled)
    }

    /// Whether the handler rejected the request.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, HandledResult::Failed(_))
    }
}

/// A single decision rule in the chain.
///
/// Decisions run synchronously on a dispatch worker and must not block for
/// long; the worker holds a shared lock on the chain for the whole walk.
pub trait Handler: Send + Sync + 'static {
    /// Name used in logs and in [`ChainSchema`](crate::ChainSchema).
    fn name(&self) -> &str;

    /// Decide what to do with the request.
    fn decide(&self, request: &Request) -> HandledResult;
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn decide(&self, request: &Request) -> HandledResult {
        (**self).decide(request)
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn decide(&self, request: &Request) -> HandledResult {
        (**self).decide(request)
    }
}

/// Adapter turning a named closure into a [`Handler`].
pub struct FnHandler<F>
where
    F: Fn(&Request) -> HandledResult + Send + Sync + 'static,
{
    name: String,
    decide: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Request) -> HandledResult + Send + Sync + 'static,
{
    /// Create a new closure handler.
    pub fn new(name: impl Into<String>, decide: F) -> Self {
        Self {
            name: name.into(),
            decide,
        }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Request) -> HandledResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, request: &Request) -> HandledResult {
        (self.decide)(request)
    }
}
