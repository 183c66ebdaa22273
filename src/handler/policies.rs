//! Built-in decision policies.
//!
//! Each policy is a pure function of the request's type tag; the chain walk
//! logs every decision. The default assembly is Validation → Process → Log → Auth.

use crate::error::ChainError;
use crate::request::Request;

use super::{HandledResult, Handler};

/// Reason reported by [`ProcessHandler`].
pub const PROCESSING_FAILED_REASON: &str = "Failed to process request";

/// Rejects requests with an empty type tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationHandler;

impl Handler for ValidationHandler {
    fn name(&self) -> &str {
        "validation"
    }

    fn decide(&self, request: &Request) -> HandledResult {
        if request.request_type().is_empty() {
            return HandledResult::Failed(ChainError::InvalidRequest);
        }
        HandledResult::NotHandled
    }
}

/// Fails every `"process"` request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHandler;

impl Handler for ProcessHandler {
    fn name(&self) -> &str {
        "process"
    }

    fn decide(&self, request: &Request) -> HandledResult {
        if request.request_type() == "process" {
            return HandledResult::Failed(ChainError::ProcessingFailed(
                PROCESSING_FAILED_REASON.to_string(),
            ));
        }
        HandledResult::NotHandled
    }
}

/// Claims `"log"` requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandler;

impl Handler for LogHandler {
    fn name(&self) -> &str {
        "log"
    }

    fn decide(&self, request: &Request) -> HandledResult {
        if request.request_type() == "log" {
            return HandledResult::Handled;
        }
        HandledResult::NotHandled
    }
}

/// Claims `"auth"` requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthHandler;

impl Handler for AuthHandler {
    fn name(&self) -> &str {
        "auth"
    }

    fn decide(&self, request: &Request) -> HandledResult {
        if request.request_type() == "auth" {
            return HandledResult::Handled;
        }
        HandledResult::NotHandled
    }
}

/// The four built-in policies in default order.
pub fn default_handlers() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(ValidationHandler),
        Box::new(ProcessHandler),
        Box::new(LogHandler),
        Box::new(AuthHandler),
    ]
}
