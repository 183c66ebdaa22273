//! Job queue task serializing chain mutations against dispatches.
//!
//! All operations on a [`ChainManager`](crate::ChainManager) become jobs on a
//! single unbounded mpsc channel drained by one task:
//!
//! ```text
//! add_handler ─┐                          ┌─ Append:   write lock, link tail
//! dispatch    ─┼─► mpsc::UnboundedSender ─┼─ Dispatch: read guard ─► worker task
//! describe    ─┘        (FIFO)            └─ Inspect:  read lock, snapshot
//! ```
//!
//! The queue task acquires the chain lock for each job in submission order.
//! Dispatch workers hold their shared guard for the whole walk, so an append
//! waits for earlier walks to finish and later dispatches wait for the
//! append. Tokio's `RwLock` is fair, which keeps that order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock, Semaphore};
use tokio::task::JoinHandle;

use crate::dispatch::Completion;
use crate::error::{ChainError, Result};
use crate::handler::{HandlerChain, Handler};
use crate::request::Request;
use crate::schema::ChainSchema;

/// A unit of work for the queue task.
pub(crate) enum Job {
    Append(Box<dyn Handler>),
    Dispatch {
        request: Arc<Request>,
        completion: Completion,
    },
    Inspect(oneshot::Sender<ChainSchema>),
}

/// Handle for submitting jobs to the queue task.
#[derive(Clone)]
pub(crate) struct QueueHandle {
    tx: mpsc::UnboundedSender<Job>,
    in_flight: Arc<AtomicUsize>,
}

impl QueueHandle {
    /// Submit a job without waiting. Returns the job if the queue is gone.
    pub(crate) fn submit(&self, job: Job) -> std::result::Result<(), Job> {
        let is_dispatch = matches!(job, Job::Dispatch { .. });
        if is_dispatch {
            self.in_flight.fetch_add(1, Ordering::AcqRel);
        }

        self.tx.send(job).map_err(|rejected| {
            if is_dispatch {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            rejected.0
        })
    }

    /// Dispatches submitted but not yet completed.
    #[inline]
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Spawn the queue task and return a handle for submitting jobs.
///
/// `max_concurrent_dispatches` bounds the number of walks running at once;
/// when saturated the queue task waits for a worker to finish.
pub(crate) fn spawn_queue_task(max_concurrent_dispatches: usize) -> (QueueHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let chain = Arc::new(RwLock::new(HandlerChain::new()));
    let semaphore = Arc::new(Semaphore::new(max_concurrent_dispatches.max(1)));

    let handle = QueueHandle {
        tx,
        in_flight: in_flight.clone(),
    };
    let task = tokio::spawn(queue_loop(rx, chain, semaphore, in_flight));

    (handle, task)
}

/// Main queue loop - runs until every sender is dropped, draining what is left.
async fn queue_loop(
    mut rx: mpsc::UnboundedReceiver<Job>,
    chain: Arc<RwLock<HandlerChain>>,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Append(handler) => {
                let mut chain = chain.write().await;
                let name = handler.name().to_string();
                chain.append(handler);
                tracing::debug!(handler = %name, len = chain.len(), "handler appended");
            }
            Job::Dispatch {
                request,
                completion,
            } => {
                // Permit is held until the worker completes.
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => {
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                        completion.complete(Err(ChainError::ManagerClosed));
                        continue;
                    }
                };
                let guard = chain.clone().read_owned().await;
                let in_flight = in_flight.clone();

                tracing::debug!(
                    request_type = request.request_type(),
                    handlers = guard.len(),
                    "dispatch scheduled"
                );

                tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = walk_guarded(&guard, &request);
                    drop(guard);

                    if let Err(e) = &outcome {
                        tracing::debug!(request_type = request.request_type(), error = %e, "dispatch failed");
                    }

                    in_flight.fetch_sub(1, Ordering::AcqRel);
                    completion.complete(outcome);
                });
            }
            Job::Inspect(reply) => {
                let chain = chain.read().await;
                if reply.send(ChainSchema::from_chain(&chain)).is_err() {
                    tracing::warn!("Chain inspection requested but receiver dropped");
                }
            }
        }
    }

    tracing::debug!("job queue closed");
}

/// Reason recorded when a handler panics mid-walk.
pub(crate) const HANDLER_PANICKED_REASON: &str = "handler panicked";

/// Walk the chain, turning a handler panic into a terminal error so the
/// completion still fires.
fn walk_guarded(chain: &HandlerChain, request: &Request) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| chain.walk(request))) {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::error!(
                request_type = request.request_type(),
                "Handler panicked during dispatch"
            );
            let error = ChainError::ProcessingFailed(HANDLER_PANICKED_REASON.to_string());
            request.set_error(error.clone());
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{FnHandler, HandledResult, LogHandler};

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let (queue, _task) = spawn_queue_task(4);

        let (tx, rx) = oneshot::channel();
        assert!(queue.submit(Job::Append(Box::new(LogHandler))).is_ok());
        assert!(queue.submit(Job::Inspect(tx)).is_ok());

        let schema = rx.await.unwrap();
        assert_eq!(schema.names(), ["log"]);
    }

    #[tokio::test]
    async fn test_dispatch_counts_in_flight() {
        let (queue, _task) = spawn_queue_task(4);
        let (completion, handle) = Completion::channel(None);

        let request = Request::shared("log");
        assert!(queue
            .submit(Job::Dispatch {
                request: request.clone(),
                completion,
            })
            .is_ok());

        assert_eq!(handle.await, Err(ChainError::HandlerNotFound));
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(request.error(), Some(ChainError::HandlerNotFound));
    }

    #[test]
    fn test_walk_guarded_maps_panic() {
        let mut chain = HandlerChain::new();
        chain.append(Box::new(FnHandler::new("explode", |_: &Request| -> HandledResult {
            panic!("decision failed")
        })));

        let request = Request::new("any");
        let expected = ChainError::ProcessingFailed(HANDLER_PANICKED_REASON.to_string());
        assert_eq!(walk_guarded(&chain, &request), Err(expected.clone()));
        assert_eq!(request.error(), Some(expected));
        assert!(!request.is_handled());
    }

    #[tokio::test]
    async fn test_submit_after_close_returns_job() {
        let (queue, task) = spawn_queue_task(1);
        task.abort();
        let _ = task.await;

        let (completion, _handle) = Completion::channel(None);
        let rejected = queue.submit(Job::Dispatch {
            request: Request::shared("log"),
            completion,
        });

        assert!(matches!(rejected, Err(Job::Dispatch { .. })));
        assert_eq!(queue.in_flight(), 0);
    }
}
