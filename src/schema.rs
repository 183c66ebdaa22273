//! Chain description for diagnostics.
//!
//! A [`ChainSchema`] lists the installed handlers in chain order. It is
//! built from a consistent snapshot of the chain, so it reflects every
//! append completed before it was taken.
//!
//! # Example
//!
//! ```
//! use handler_chain::handler::{default_handlers, HandlerChain};
//! use handler_chain::ChainSchema;
//!
//! let mut chain = HandlerChain::new();
//! for handler in default_handlers() {
//!     chain.append(handler);
//! }
//!
//! let schema = ChainSchema::from_chain(&chain);
//! assert_eq!(schema.names(), ["validation", "process", "log", "auth"]);
//! assert!(schema.to_json().unwrap().contains("\"validation\""));
//! ```

use serde::{Deserialize, Serialize};

use crate::handler::HandlerChain;

/// One installed handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerEntry {
    /// Zero-based position in the chain.
    pub position: usize,
    /// Handler name.
    pub name: String,
}

/// Ordered list of installed handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSchema {
    /// Handlers in chain order.
    pub handlers: Vec<HandlerEntry>,
}

impl ChainSchema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a chain.
    pub fn from_chain(chain: &HandlerChain) -> Self {
        let handlers = chain
            .iter()
            .enumerate()
            .map(|(position, node)| HandlerEntry {
                position,
                name: node.name().to_string(),
            })
            .collect();
        Self { handlers }
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if schema is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler names in chain order.
    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name.as_str()).collect()
    }

    /// First handler with the given name.
    pub fn get(&self, name: &str) -> Option<&HandlerEntry> {
        self.handlers.iter().find(|h| h.name == name)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
