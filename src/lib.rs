//! # handler-chain
//!
//! A concurrency-safe, append-only chain of request handlers
//! (Chain-of-Responsibility) with asynchronous dispatch.
//!
//! Handlers may be appended while requests are in flight. Each dispatch
//! walks the chain on a worker task and delivers exactly one outcome.
//!
//! ## Architecture
//!
//! - **Request**: type tag plus a lock-guarded handled flag and terminal error
//! - **Handler**: a `decide` function linked into a singly-linked chain
//! - **ChainManager**: a FIFO job queue that applies appends exclusively and
//!   runs walks concurrently under a shared lock
//!
//! ## Example
//!
//! ```
//! use handler_chain::{ChainError, ChainManager, Request};
//! use handler_chain::handler::{AuthHandler, LogHandler, ProcessHandler, ValidationHandler};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let manager = ChainManager::new();
//! manager.add_handler(ValidationHandler);
//! manager.add_handler(ProcessHandler);
//! manager.add_handler(LogHandler);
//! manager.add_handler(AuthHandler);
//!
//! let request = Request::shared("log");
//! assert_eq!(manager.dispatch(request.clone()).await, Ok(()));
//! assert!(request.is_handled());
//!
//! let request = Request::shared("");
//! assert_eq!(manager.dispatch(request).await, Err(ChainError::InvalidRequest));
//! # }
//! ```

pub mod error;
pub mod handler;
pub mod request;

mod dispatch;
mod manager;
mod queue;
mod schema;

pub use dispatch::{BoxFuture, CompletionCallback, DispatchHandle};
pub use error::{ChainError, Result};
pub use handler::{HandledResult, Handler};
pub use manager::{
    ChainManager, ChainManagerBuilder, ManagerConfig, DEFAULT_MAX_CONCURRENT_DISPATCHES,
};
pub use request::{Request, RequestOutcome};
pub use schema::{ChainSchema, HandlerEntry};
