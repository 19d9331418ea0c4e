//! Registry of embedded views hosted by one client.
//!
//! Ids start at 1 and are never reused within a registry. Identity is by
//! instance (`Arc` pointer), not by value.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use vrpc_core::BrowserId;

struct Inner<T: ?Sized> {
    browsers: BTreeMap<BrowserId, Arc<T>>,
    last_id: BrowserId,
}

/// Browser id ↔ view handle map.
pub struct BrowserRegistry<T: ?Sized> {
    inner: RwLock<Inner<T>>,
}

fn same_instance<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

impl<T: ?Sized> BrowserRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                browsers: BTreeMap::new(),
                last_id: 0,
            }),
        }
    }

    /// Register `browser`, or return its id if this instance is already known.
    pub fn register(&self, browser: Arc<T>) -> BrowserId {
        let mut inner = self.inner.write();
        if let Some(id) = find(&inner.browsers, &browser) {
            return id;
        }

        inner.last_id += 1;
        let id = inner.last_id;
        inner.browsers.insert(id, browser);
        debug!(browser_id = id, "View registered");
        id
    }

    /// Remove `browser`. Returns its former id.
    pub fn unregister(&self, browser: &Arc<T>) -> Option<BrowserId> {
        let mut inner = self.inner.write();
        let id = find(&inner.browsers, browser)?;
        inner.browsers.remove(&id);
        debug!(browser_id = id, "View unregistered");
        Some(id)
    }

    /// Remove the view registered under `id`.
    pub fn remove(&self, id: BrowserId) -> Option<Arc<T>> {
        self.inner.write().browsers.remove(&id)
    }

    pub fn id_of(&self, browser: &Arc<T>) -> Option<BrowserId> {
        find(&self.inner.read().browsers, browser)
    }

    pub fn get(&self, id: BrowserId) -> Option<Arc<T>> {
        self.inner.read().browsers.get(&id).cloned()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<BrowserId> {
        self.inner.read().browsers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().browsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().browsers.is_empty()
    }
}

impl<T: ?Sized> Default for BrowserRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn find<T: ?Sized>(browsers: &BTreeMap<BrowserId, Arc<T>>, browser: &Arc<T>) -> Option<BrowserId> {
    browsers
        .iter()
        .find(|(_, known)| same_instance(known, browser))
        .map(|(id, _)| *id)
}
