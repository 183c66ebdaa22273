//! Integration tests for handler-chain.
//!
//! These tests drive the public `ChainManager` API end to end.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use handler_chain::handler::{
    default_handlers, AuthHandler, FnHandler, HandledResult, Handler, LogHandler, ProcessHandler,
    ValidationHandler,
};
use handler_chain::{ChainError, ChainManager, Request, RequestOutcome};
use tokio::sync::oneshot;

/// Wraps a handler and records its name every time it decides.
struct Recorded<H> {
    inner: H,
    calls: Arc<Mutex<Vec<String>>>,
}

impl<H: Handler> Handler for Recorded<H> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn decide(&self, request: &Request) -> HandledResult {
        self.calls.lock().unwrap().push(self.inner.name().to_string());
        self.inner.decide(request)
    }
}

/// Default chain with every decision recorded.
fn recorded_manager() -> (ChainManager, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let manager = ChainManager::new();

    manager.add_handler(Recorded {
        inner: ValidationHandler,
        calls: calls.clone(),
    });
    manager.add_handler(Recorded {
        inner: ProcessHandler,
        calls: calls.clone(),
    });
    manager.add_handler(Recorded {
        inner: LogHandler,
        calls: calls.clone(),
    });
    manager.add_handler(Recorded {
        inner: AuthHandler,
        calls: calls.clone(),
    });

    (manager, calls)
}

/// A "log" request stops at the log handler.
#[tokio::test]
async fn test_log_request_stops_at_log_handler() {
    let (manager, calls) = recorded_manager();
    let request = Request::shared("log");

    assert_eq!(manager.dispatch(request.clone()).await, Ok(()));
    assert!(request.is_handled());
    assert_eq!(request.error(), None);
    assert_eq!(*calls.lock().unwrap(), ["validation", "process", "log"]);
}

/// An empty type tag is rejected by validation alone.
#[tokio::test]
async fn test_validation_short_circuit() {
    let (manager, calls) = recorded_manager();
    let request = Request::shared("");

    assert_eq!(
        manager.dispatch(request.clone()).await,
        Err(ChainError::InvalidRequest)
    );
    assert_eq!(request.error(), Some(ChainError::InvalidRequest));
    assert_eq!(*calls.lock().unwrap(), ["validation"]);
}

/// A "process" request fails in the process handler.
#[tokio::test]
async fn test_processing_failure() {
    let (manager, calls) = recorded_manager();
    let request = Request::shared("process");

    let expected = ChainError::ProcessingFailed("Failed to process request".to_string());
    assert_eq!(manager.dispatch(request.clone()).await, Err(expected.clone()));
    assert!(!request.is_handled());
    assert_eq!(request.error(), Some(expected));
    assert_eq!(*calls.lock().unwrap(), ["validation", "process"]);
}

/// An unclaimed request runs through every handler and is not found.
#[tokio::test]
async fn test_exhaustion() {
    let (manager, calls) = recorded_manager();
    let request = Request::shared("unknown-xyz");

    assert_eq!(
        manager.dispatch(request.clone()).await,
        Err(ChainError::HandlerNotFound)
    );
    assert!(!request.is_handled());
    assert_eq!(
        *calls.lock().unwrap(),
        ["validation", "process", "log", "auth"]
    );
}

/// Dispatching against an empty manager fails without running anything.
#[tokio::test]
async fn test_empty_chain() {
    let manager = ChainManager::new();
    let request = Request::shared("log");

    assert_eq!(
        manager.dispatch(request.clone()).await,
        Err(ChainError::HandlerNotFound)
    );
    assert_eq!(request.outcome(), RequestOutcome::Failed(ChainError::HandlerNotFound));
}

/// Appends from many tasks all land exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends() {
    const N: usize = 200;
    let manager = Arc::new(ChainManager::new());

    let tasks: Vec<_> = (0..N)
        .map(|i| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager.add_handler(FnHandler::new(format!("h{}", i), |_: &Request| {
                    HandledResult::NotHandled
                }));
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let schema = manager.describe().await.unwrap();
    assert_eq!(schema.len(), N);

    let names: HashSet<_> = schema.names().into_iter().collect();
    assert_eq!(names.len(), N);
    for (position, entry) in schema.handlers.iter().enumerate() {
        assert_eq!(entry.position, position);
    }

    // The walk visits each handler once and terminates.
    let request = Request::shared("anything");
    assert_eq!(manager.dispatch(request).await, Err(ChainError::HandlerNotFound));
}

/// Many concurrent dispatches each see only their own outcome.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches() {
    const M: usize = 400;
    let manager = ChainManager::builder()
        .handlers(default_handlers())
        .max_concurrent_dispatches(16)
        .build();

    let types = ["", "process", "log", "auth", "unknown-xyz"];
    let completions = Arc::new(AtomicUsize::new(0));

    let mut pending = Vec::with_capacity(M);
    for i in 0..M {
        let request = Request::shared(types[i % types.len()]);
        let completions = completions.clone();
        let (tx, rx) = oneshot::channel();

        manager.dispatch_with(request.clone(), move |error| {
            completions.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(error);
        });
        pending.push((request, rx));
    }

    for (request, rx) in pending {
        let error = rx.await.unwrap();
        match request.request_type() {
            "" => assert_eq!(error, Some(ChainError::InvalidRequest)),
            "process" => assert!(matches!(error, Some(ChainError::ProcessingFailed(_)))),
            "log" | "auth" => {
                assert_eq!(error, None);
                assert!(request.is_handled());
            }
            _ => assert_eq!(error, Some(ChainError::HandlerNotFound)),
        }
        assert_eq!(request.error(), error);
        if error.is_some() {
            assert!(!request.is_handled());
        }
    }

    assert_eq!(completions.load(Ordering::SeqCst), M);
    assert_eq!(manager.in_flight(), 0);
}

/// Reads after completion are stable.
#[tokio::test]
async fn test_observation_is_stable() {
    let manager = ChainManager::builder()
        .handlers(default_handlers())
        .build();
    let request = Request::shared("process");

    let outcome = manager.dispatch(request.clone()).await;
    for _ in 0..10 {
        assert_eq!(request.error(), outcome.clone().err());
        assert!(!request.is_handled());
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(request.error(), outcome.err());
}

/// A dispatch sees exactly the appends submitted before it.
#[tokio::test]
async fn test_dispatch_observes_prior_appends() {
    let manager = ChainManager::new();

    let before = manager.dispatch(Request::shared("log"));
    manager.add_handler(LogHandler);
    let after = manager.dispatch(Request::shared("log"));

    assert_eq!(before.await, Err(ChainError::HandlerNotFound));
    assert_eq!(after.await, Ok(()));
}

/// Handlers appended while walks are in flight do not disturb them.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_append_during_dispatch() {
    let manager = Arc::new(ChainManager::new());
    manager.add_handler(ValidationHandler);

    let mut handles = Vec::new();
    for i in 0..50 {
        handles.push(manager.dispatch(Request::shared("auth")));
        if i == 25 {
            manager.add_handler(AuthHandler);
        }
    }

    let results: Vec<_> = {
        let mut out = Vec::new();
        for handle in handles {
            out.push(handle.await);
        }
        out
    };

    for (i, result) in results.iter().enumerate() {
        if i <= 25 {
            assert_eq!(*result, Err(ChainError::HandlerNotFound), "dispatch {}", i);
        } else {
            assert_eq!(*result, Ok(()), "dispatch {}", i);
        }
    }
}

/// A deadline reports a timeout while the walk still finishes on its own.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_does_not_cancel_walk() {
    let manager = ChainManager::new();
    manager.add_handler(FnHandler::new("slow", |_: &Request| {
        std::thread::sleep(Duration::from_millis(100));
        HandledResult::Handled
    }));

    let request = Request::shared("slow");
    let result = manager
        .dispatch(request.clone())
        .with_timeout(Duration::from_millis(5))
        .await;
    assert_eq!(result, Err(ChainError::Timeout(Duration::from_millis(5))));

    let mut waited = Duration::ZERO;
    while !request.is_handled() && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert!(request.is_handled());
    assert_eq!(request.error(), None);
}

/// A panicking handler still ends the dispatch with exactly one outcome.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_handler_completes_once() {
    let manager = ChainManager::new();
    manager.add_handler(FnHandler::new("explode", |_: &Request| -> HandledResult {
        panic!("decision failed")
    }));
    manager.add_handler(LogHandler);

    let expected = ChainError::ProcessingFailed("handler panicked".to_string());

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = oneshot::channel();
    let callback_request = Request::shared("log");
    let counter = calls.clone();
    manager.dispatch_with(callback_request.clone(), move |error| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(error);
    });

    let handle_request = Request::shared("log");
    let outcome = manager.dispatch(handle_request.clone()).await;

    assert_eq!(rx.await.unwrap(), Some(expected.clone()));
    assert_eq!(outcome, Err(expected.clone()));
    assert_eq!(callback_request.error(), Some(expected.clone()));
    assert_eq!(handle_request.error(), Some(expected));
    assert!(!handle_request.is_handled());

    // The manager keeps serving after the panic.
    manager.dispatch(Request::shared("x")).await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.in_flight(), 0);
}

/// Dropping the handle does not stop the walk from recording its outcome.
#[tokio::test]
async fn test_dropped_handle_still_records_outcome() {
    let manager = ChainManager::builder()
        .handlers(default_handlers())
        .build();
    let request = Request::shared("auth");

    drop(manager.dispatch(request.clone()));

    // A later dispatch completes only after the earlier one was scheduled.
    manager.dispatch(Request::shared("log")).await.unwrap();
    let mut waited = 0;
    while !request.is_handled() && waited < 200 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        waited += 1;
    }
    assert!(request.is_handled());
}
