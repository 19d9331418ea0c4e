//! Ordered interceptor chains for inbound calls.
//!
//! The most recently registered layer is the outermost one: it runs first on
//! the way in and last on the way out. A layer reaches the layers registered
//! before it (and finally the handler) only through [`Next::run`]; not calling
//! it vetoes the call.
//!
//! The chain is stored as an immutable `Arc<Vec<_>>` that registration replaces
//! wholesale. Each dispatch runs against the snapshot it captured, so adding a
//! layer never disturbs a dispatch already in flight.

use crate::domain::Envelope;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

/// One interceptor layer.
///
/// Layers observe or veto a call; they cannot fabricate a result. Logic before
/// `next.run().await` runs on the way in, logic after it on the way out.
#[async_trait]
pub trait Middleware<E: Envelope + 'static>: Send + Sync {
    async fn handle(&self, envelope: &E, next: Next<'_, E>);
}

type Terminal<'a> = Box<dyn FnOnce() -> BoxFuture<'a, ()> + Send + 'a>;

/// Continuation handed to a layer: the rest of the chain plus the handler.
pub struct Next<'a, E: Envelope + 'static> {
    layers: &'a [Arc<dyn Middleware<E>>],
    envelope: &'a E,
    terminal: Terminal<'a>,
}

impl<'a, E: Envelope + 'static> Next<'a, E> {
    /// Continue with the next inner layer, or the handler if none is left.
    pub async fn run(self) {
        let Next {
            layers,
            envelope,
            terminal,
        } = self;

        match layers.split_first() {
            Some((layer, rest)) => {
                let next = Next {
                    layers: rest,
                    envelope,
                    terminal,
                };
                layer.handle(envelope, next).await;
            }
            None => terminal().await,
        }
    }

    /// Number of layers still ahead of the handler.
    pub fn remaining(&self) -> usize {
        self.layers.len()
    }
}

/// Registration point for one direction of inbound traffic.
pub struct MiddlewareChain<E: Envelope + 'static> {
    layers: RwLock<Arc<Vec<Arc<dyn Middleware<E>>>>>,
}

impl<E: Envelope + 'static> MiddlewareChain<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Add `layer` as the new outermost layer.
    pub fn register(&self, layer: Arc<dyn Middleware<E>>) {
        let mut current = self.layers.write();
        let mut composed = Vec::with_capacity(current.len() + 1);
        composed.push(layer);
        composed.extend(current.iter().cloned());
        *current = Arc::new(composed);
    }

    /// Capture the chain as it is right now.
    pub fn snapshot(&self) -> ChainSnapshot<E> {
        ChainSnapshot {
            layers: Arc::clone(&self.layers.read()),
        }
    }

    pub fn len(&self) -> usize {
        self.layers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Envelope + 'static> Default for MiddlewareChain<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of a chain captured for one dispatch.
pub struct ChainSnapshot<E: Envelope + 'static> {
    layers: Arc<Vec<Arc<dyn Middleware<E>>>>,
}

impl<E: Envelope + 'static> ChainSnapshot<E> {
    /// Run `envelope` through every layer, ending in `terminal`.
    pub async fn run<'a, F, Fut>(&'a self, envelope: &'a E, terminal: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = ()> + Send + 'a,
    {
        let terminal: Terminal<'a> = Box::new(move || terminal().boxed());
        Next {
            layers: self.layers.as_slice(),
            envelope,
            terminal,
        }
        .run()
        .await;
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
