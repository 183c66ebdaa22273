//! Chain manager builder and public entry points.
//!
//! The [`ChainManagerBuilder`] provides a fluent API for installing handlers
//! and tuning the manager. The [`ChainManager`] owns the job queue:
//! 1. `add_handler` enqueues an append (fire-and-forget)
//! 2. `dispatch` / `dispatch_with` enqueue a walk and return immediately
//! 3. the queue task applies appends exclusively and runs walks concurrently
//! 4. each walk delivers exactly one outcome
//!
//! # Example
//!
//! ```
//! use handler_chain::{ChainError, ChainManager, Request};
//! use handler_chain::handler::default_handlers;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let manager = ChainManager::builder()
//!     .handlers(default_handlers())
//!     .build();
//!
//! let request = Request::shared("log");
//! manager.dispatch(request.clone()).await.unwrap();
//! assert!(request.is_handled());
//!
//! let request = Request::shared("process");
//! let outcome = manager.dispatch(request).await;
//! assert!(matches!(outcome, Err(ChainError::ProcessingFailed(_))));
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::dispatch::{Completion, DispatchHandle};
use crate::error::{ChainError, Result};
use crate::handler::Handler;
use crate::queue::{spawn_queue_task, Job, QueueHandle};
use crate::request::Request;
use crate::schema::ChainSchema;

/// Default maximum number of walks running at once.
pub const DEFAULT_MAX_CONCURRENT_DISPATCHES: usize = 256;

/// Configuration for a [`ChainManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Maximum number of walks running at once.
    pub max_concurrent_dispatches: usize,
    /// Deadline applied to every handle returned by `dispatch`.
    pub dispatch_timeout: Option<Duration>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: DEFAULT_MAX_CONCURRENT_DISPATCHES,
            dispatch_timeout: None,
        }
    }
}

/// Builder for configuring and creating a [`ChainManager`].
pub struct ChainManagerBuilder {
    handlers: Vec<Box<dyn Handler>>,
    config: ManagerConfig,
}

impl ChainManagerBuilder {
    /// Create a new builder with no handlers and default configuration.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            config: ManagerConfig::default(),
        }
    }

    /// Append a handler. Handlers are installed in the order given.
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Append several boxed handlers.
    pub fn handlers<I>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Handler>>,
    {
        self.handlers.extend(handlers);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of walks running at once.
    ///
    /// Default: 256
    pub fn max_concurrent_dispatches(mut self, limit: usize) -> Self {
        self.config.max_concurrent_dispatches = limit;
        self
    }

    /// Apply a deadline to every handle returned by `dispatch`.
    ///
    /// Default: none
    pub fn dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.config.dispatch_timeout = Some(timeout);
        self
    }

    /// Build the manager and start its queue task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn build(self) -> ChainManager {
        let manager = ChainManager::with_config(self.config);
        for handler in self.handlers {
            manager.add_boxed_handler(handler);
        }
        manager
    }
}

impl Default for ChainManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the handler chain and its job queue.
///
/// Dropping the manager closes the queue; already queued jobs still run.
pub struct ChainManager {
    queue: QueueHandle,
    config: ManagerConfig,
    _queue_task: JoinHandle<()>,
}

impl ChainManager {
    /// Create a manager with an empty chain and default configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Create a manager with an empty chain.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_config(config: ManagerConfig) -> Self {
        let (queue, queue_task) = spawn_queue_task(config.max_concurrent_dispatches);
        Self {
            queue,
            config,
            _queue_task: queue_task,
        }
    }

    /// Create a new manager builder.
    pub fn builder() -> ChainManagerBuilder {
        ChainManagerBuilder::new()
    }

    /// The manager's configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Append a handler to the tail of the chain.
    ///
    /// Fire-and-forget: the append is applied by the queue task, before any
    /// job submitted after this call.
    pub fn add_handler<H: Handler>(&self, handler: H) {
        self.add_boxed_handler(Box::new(handler));
    }

    /// Append an already boxed handler.
    pub fn add_boxed_handler(&self, handler: Box<dyn Handler>) {
        if let Err(Job::Append(handler)) = self.queue.submit(Job::Append(handler)) {
            tracing::warn!(handler = handler.name(), "queue closed, handler not appended");
        }
    }

    /// Walk the chain for `request` on a worker task.
    ///
    /// Never blocks. The returned handle resolves exactly once; the
    /// configured `dispatch_timeout`, if any, is already applied to it.
    pub fn dispatch(&self, request: Arc<Request>) -> DispatchHandle {
        let (completion, handle) = Completion::channel(self.config.dispatch_timeout);
        self.submit_dispatch(request, completion);
        handle
    }

    /// Walk the chain for `request`, reporting through a callback.
    ///
    /// `on_complete` is invoked exactly once with `None` on success or the
    /// error that ended the walk.
    pub fn dispatch_with<F>(&self, request: Arc<Request>, on_complete: F)
    where
        F: FnOnce(Option<ChainError>) + Send + 'static,
    {
        self.submit_dispatch(request, Completion::Callback(Box::new(on_complete)));
    }

    fn submit_dispatch(&self, request: Arc<Request>, completion: Completion) {
        let job = Job::Dispatch {
            request,
            completion,
        };
        if let Err(Job::Dispatch {
            request,
            completion,
        }) = self.queue.submit(job)
        {
            tracing::warn!(
                request_type = request.request_type(),
                "queue closed, dispatch rejected"
            );
            request.set_error(ChainError::ManagerClosed);
            completion.complete(Err(ChainError::ManagerClosed));
        }
    }

    /// Describe the chain as seen after every previously submitted append.
    pub async fn describe(&self) -> Result<ChainSchema> {
        let (tx, rx) = oneshot::channel();
        self.queue
            .submit(Job::Inspect(tx))
            .map_err(|_| ChainError::ManagerClosed)?;
        rx.await.map_err(|_| ChainError::ManagerClosed)
    }

    /// Number of handlers after every previously submitted append.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.describe().await?.len())
    }

    /// Check if the chain is empty after every previously submitted append.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.describe().await?.is_empty())
    }

    /// Dispatches submitted but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }
}

impl Default for ChainManager {
    fn default() -> Self {
        Self::new()
    }
}
