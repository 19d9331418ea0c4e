//! Name → handler maps.
//!
//! Registration is insert-if-absent: the first handler bound to a name wins and
//! later registrations under the same name are no-ops. A controller owns two
//! independent registries (fire-and-forget and call-and-reply).

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Concurrent procedure registry keyed by name.
pub struct ProcedureRegistry<H: ?Sized> {
    procedures: DashMap<String, Arc<H>>,
}

impl<H: ?Sized> ProcedureRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            procedures: DashMap::new(),
        }
    }

    /// Bind `handler` to `name` unless the name is already bound.
    ///
    /// Returns `true` if this call created the binding. Concurrent registrations
    /// of one name resolve to exactly one winner.
    pub fn register(&self, name: impl Into<String>, handler: Arc<H>) -> bool {
        match self.procedures.entry(name.into()) {
            Entry::Occupied(entry) => {
                debug!(name = %entry.key(), "Procedure already registered, keeping first binding");
                false
            }
            Entry::Vacant(entry) => {
                debug!(name = %entry.key(), "Procedure registered");
                entry.insert(handler);
                true
            }
        }
    }

    /// Remove a binding. Returns `true` if one was present.
    pub fn unregister(&self, name: &str) -> bool {
        self.procedures.remove(name).is_some()
    }

    /// Look up the handler bound to `name`.
    pub fn lookup(&self, name: &str) -> Option<Arc<H>> {
        self.procedures
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Registered names, unordered.
    pub fn names(&self) -> Vec<String> {
        self.procedures
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl<H: ?Sized> Default for ProcedureRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
