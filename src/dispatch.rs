//! Completion delivery for dispatched requests.
//!
//! Every dispatch produces exactly one outcome. It is delivered either to a
//! [`DispatchHandle`] (a oneshot-backed future) or to a caller-supplied
//! callback, depending on which entry point was used.
//!
//! # Example
//!
//! ```ignore
//! let handle = manager.dispatch(Request::shared("log"));
//! handle.with_timeout(Duration::from_secs(1)).await?;
//! ```

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{ChainError, Result};

/// Boxed future for dispatch outcomes.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Callback form of completion: `None` on success, the error otherwise.
pub type CompletionCallback = Box<dyn FnOnce(Option<ChainError>) + Send + 'static>;

/// Where a dispatch outcome goes.
pub(crate) enum Completion {
    Channel(oneshot::Sender<Result<()>>),
    Callback(CompletionCallback),
}

impl Completion {
    /// Create a channel completion and the handle that receives it.
    pub(crate) fn channel(timeout: Option<Duration>) -> (Self, DispatchHandle) {
        let (tx, rx) = oneshot::channel();
        (Completion::Channel(tx), DispatchHandle { rx, timeout })
    }

    /// Deliver the outcome. Consumes self, so it runs at most once.
    pub(crate) fn complete(self, outcome: Result<()>) {
        match self {
            Completion::Channel(tx) => {
                if tx.send(outcome).is_err() {
                    tracing::debug!("dispatch handle dropped before completion");
                }
            }
            Completion::Callback(callback) => callback(outcome.err()),
        }
    }
}

/// Handle resolving to the outcome of one dispatch.
///
/// Await it directly, or call [`wait`](Self::wait). Dropping the handle does
/// not cancel the walk.
#[derive(Debug)]
pub struct DispatchHandle {
    rx: oneshot::Receiver<Result<()>>,
    timeout: Option<Duration>,
}

impl DispatchHandle {
    /// Apply a deadline to waiting on this handle.
    ///
    /// On expiry the handle resolves to [`ChainError::Timeout`]. The walk is
    /// not interrupted and still records its outcome on the request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The deadline applied when waiting, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Take the outcome if it has already arrived, without waiting.
    pub fn try_outcome(&mut self) -> Option<Result<()>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ChainError::ManagerClosed)),
        }
    }

    /// Wait for the outcome.
    pub async fn wait(self) -> Result<()> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.rx).await {
                Ok(received) => received.unwrap_or(Err(ChainError::ManagerClosed)),
                Err(_) => Err(ChainError::Timeout(limit)),
            },
            None => self.rx.await.unwrap_or(Err(ChainError::ManagerClosed)),
        }
    }
}

impl IntoFuture for DispatchHandle {
    type Output = Result<()>;
    type IntoFuture = BoxFuture<'static, Result<()>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_channel_completion_delivers_outcome() {
        let (completion, handle) = Completion::channel(None);
        completion.complete(Err(ChainError::HandlerNotFound));
        assert_eq!(handle.await, Err(ChainError::HandlerNotFound));
    }

    #[tokio::test]
    async fn test_dropped_sender_reports_closed() {
        let (completion, handle) = Completion::channel(None);
        drop(completion);
        assert_eq!(handle.wait().await, Err(ChainError::ManagerClosed));
    }

    #[tokio::test]
    async fn test_try_outcome() {
        let (completion, mut handle) = Completion::channel(None);
        assert!(handle.try_outcome().is_none());

        completion.complete(Ok(()));
        assert_eq!(handle.try_outcome(), Some(Ok(())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_elapses() {
        let (completion, handle) = Completion::channel(None);
        let handle = handle.with_timeout(Duration::from_millis(20));
        assert_eq!(handle.timeout(), Some(Duration::from_millis(20)));

        let result = handle.await;
        assert_eq!(result, Err(ChainError::Timeout(Duration::from_millis(20))));

        // Completing after the waiter gave up is harmless.
        completion.complete(Ok(()));
    }

    #[test]
    fn test_callback_completion() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        for outcome in [Ok(()), Err(ChainError::InvalidRequest)] {
            let seen = seen.clone();
            Completion::Callback(Box::new(move |error| seen.lock().unwrap().push(error)))
                .complete(outcome);
        }

        assert_eq!(
            *seen.lock().unwrap(),
            [None, Some(ChainError::InvalidRequest)]
        );
    }
}
