//! Append-only singly-linked handler chain and the walk over it.
//!
//! Nodes are linked through write-once successor cells, so a link, once
//! observed, never changes. [`HandlerChain`] keeps head, tail and length;
//! it is not synchronized itself and is shared by the chain manager behind
//! a readers-writer lock.
//!
//! # Walk
//!
//! ```text
//! current := head
//! loop:
//!   current == None  -> Err(HandlerNotFound)
//!   Handled          -> request.handled = true, Ok(())
//!   Failed(e)        -> Err(e)
//!   NotHandled       -> current := current.successor
//! ```

use std::sync::{Arc, OnceLock};

use crate::error::{ChainError, Result};
use crate::request::Request;

use super::{HandledResult, Handler};

/// A handler plus its link to the next node.
pub struct HandlerNode {
    handler: Box<dyn Handler>,
    successor: OnceLock<Arc<HandlerNode>>,
}

impl HandlerNode {
    fn new(handler: Box<dyn Handler>) -> Self {
        Self {
            handler,
            successor: OnceLock::new(),
        }
    }

    /// Name of the wrapped handler.
    #[inline]
    pub fn name(&self) -> &str {
        self.handler.name()
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    /// The next node, if linked.
    #[inline]
    pub fn successor(&self) -> Option<&Arc<HandlerNode>> {
        self.successor.get()
    }

    /// Link `next` as this node's successor. Only ever called on the tail.
    fn link(&self, next: Arc<HandlerNode>) {
        let linked = self.successor.set(next).is_ok();
        debug_assert!(linked, "handler {} is already linked", self.name());
    }

    /// Walk the chain starting at this node.
    pub fn handle(&self, request: &Request) -> Result<()> {
        walk(Some(self), request)
    }
}

// Unlink iteratively so dropping a long chain, or the last outside clone of
// a node in its middle, does not recurse once per node. Stops at a successor
// still shared elsewhere; that owner's drop continues the unlinking.
impl Drop for HandlerNode {
    fn drop(&mut self) {
        let mut next = self.successor.take();
        while let Some(node) = next {
            next = match Arc::try_unwrap(node) {
                Ok(mut node) => node.successor.take(),
                Err(_) => None,
            };
        }
    }
}

impl std::fmt::Debug for HandlerNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerNode")
            .field("name", &self.name())
            .field("successor", &self.successor().map(|next| next.name()))
            .finish()
    }
}

/// Walk from `head`, recording any terminal error on the request.
pub fn walk(head: Option<&HandlerNode>, request: &Request) -> Result<()> {
    let mut current = head;

    let outcome = loop {
        let Some(node) = current else {
            break Err(ChainError::HandlerNotFound);
        };

        match node.handler.decide(request) {
            HandledResult::Handled => {
                tracing::trace!(handler = node.name(), "request handled");
                request.set_handled(true);
                break Ok(());
            }
            HandledResult::Failed(error) => {
                tracing::trace!(handler = node.name(), %error, "request rejected");
                break Err(error);
            }
            HandledResult::NotHandled => {
                tracing::trace!(handler = node.name(), "request not handled");
                current = node.successor().map(Arc::as_ref);
            }
        }
    };

    if let Err(error) = &outcome {
        request.set_error(error.clone());
    }
    outcome
}

/// Head, tail and length of an append-only chain.
#[derive(Debug, Default)]
pub struct HandlerChain {
    head: Option<Arc<HandlerNode>>,
    tail: Option<Arc<HandlerNode>>,
    len: usize,
}

impl HandlerChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler at the tail. The first handler becomes head.
    pub fn append(&mut self, handler: Box<dyn Handler>) {
        let node = Arc::new(HandlerNode::new(handler));

        match &self.tail {
            Some(tail) => tail.link(node.clone()),
            None => self.head = Some(node.clone()),
        }

        self.tail = Some(node);
        self.len += 1;
    }

    /// First node, if any.
    pub fn head(&self) -> Option<&Arc<HandlerNode>> {
        self.head.as_ref()
    }

    /// Number of handlers.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the chain has no handlers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Iterate nodes in chain order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Walk the chain for one request.
    pub fn walk(&self, request: &Request) -> Result<()> {
        walk(self.head.as_deref(), request)
    }
}

/// Iterator over the nodes of a [`HandlerChain`].
pub struct Iter<'a> {
    next: Option<&'a HandlerNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a HandlerNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.successor().map(Arc::as_ref);
        Some(node)
    }
}

impl<'a> IntoIterator for &'a HandlerChain {
    type Item = &'a HandlerNode;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
