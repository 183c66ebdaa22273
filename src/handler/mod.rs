//! Handler module - decision protocol, built-in policies and the chain.
//!
//! Provides:
//! - [`Handler`] - the single extension point, a `decide` function
//! - [`HandledResult`] - handled / not handled / failed
//! - [`HandlerChain`] - append-only linked list of handlers and the walk
//! - the four built-in policies and [`default_handlers`]
//!
//! # Example
//!
//! ```
//! use handler_chain::handler::{default_handlers, HandlerChain};
//! use handler_chain::{ChainError, Request};
//!
//! let mut chain = HandlerChain::new();
//! for handler in default_handlers() {
//!     chain.append(handler);
//! }
//!
//! let request = Request::new("log");
//! assert!(chain.walk(&request).is_ok());
//! assert!(request.is_handled());
//!
//! let request = Request::new("");
//! assert_eq!(chain.walk(&request), Err(ChainError::InvalidRequest));
//! ```

mod chain;
mod decision;
mod policies;

pub use chain::{walk, HandlerChain, HandlerNode, Iter};
pub use decision::{FnHandler, HandledResult, Handler};
pub use policies::{
    default_handlers, AuthHandler, LogHandler, ProcessHandler, ValidationHandler,
    PROCESSING_FAILED_REASON,
};
