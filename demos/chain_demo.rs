//! Chain demo - default handler assembly end to end.
//!
//! This example demonstrates:
//! - Appending the four built-in handlers to a `ChainManager`
//! - Awaiting a single dispatch
//! - Dispatching a concurrent batch with completion callbacks
//!
//! # Running
//!
//! ```text
//! RUST_LOG=handler_chain=trace,chain_demo=info cargo run --example chain_demo
//! ```

use std::sync::Arc;

use handler_chain::handler::{AuthHandler, LogHandler, ProcessHandler, ValidationHandler};
use handler_chain::{ChainManager, Request};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let manager = ChainManager::new();
    manager.add_handler(ValidationHandler);
    manager.add_handler(ProcessHandler);
    manager.add_handler(LogHandler);
    manager.add_handler(AuthHandler);

    tracing::info!(chain = %manager.describe().await?.to_json()?, "chain assembled");

    let request = Request::shared("log");
    match manager.dispatch(request.clone()).await {
        Ok(()) => tracing::info!(handled = request.is_handled(), "log request completed"),
        Err(e) => tracing::error!("log request failed: {}", e),
    }

    // Concurrent batch: one completion per request, in any order.
    let types = ["", "process", "log", "auth"];
    let (tx, mut rx) = mpsc::unbounded_channel();

    for index in 0..10 {
        let request: Arc<Request> = Request::shared(types[index % types.len()]);
        let tx = tx.clone();
        manager.dispatch_with(request.clone(), move |error| {
            let _ = tx.send((index, request, error));
        });
    }
    drop(tx);

    while let Some((index, request, error)) = rx.recv().await {
        match error {
            Some(e) => tracing::warn!(index, request_type = request.request_type(), "failed: {}", e),
            None => tracing::info!(index, request_type = request.request_type(), "handled"),
        }
    }

    Ok(())
}
