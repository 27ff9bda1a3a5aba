//! Hook registry.
//!
//! Priority-sorted collection of [`HookHandler`] instances per
//! [`HookPoint`]. The registry is the source of truth for which handlers
//! are active and what order they run in.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::handler::HookHandler;
use crate::types::HookPoint;

/// Registry of lifecycle hook handlers.
///
/// Handlers are bucketed by [`HookPoint`] and kept sorted by priority
/// descending within each bucket.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<HookPoint, Vec<Arc<dyn HookHandler>>>,
}

impl HookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// Register a handler.
    ///
    /// A handler with the same name at the same point is replaced; the
    /// bucket is re-sorted by priority descending.
    pub fn register(&mut self, handler: Arc<dyn HookHandler>) {
        let point = handler.point();
        let name = handler.name().to_owned();

        let handlers = self.hooks.entry(point).or_default();
        handlers.retain(|existing| existing.name() != name);

        debug!(name = %name, %point, priority = handler.priority(), "registering hook");
        handlers.push(handler);
        handlers.sort_by_key(|h| std::cmp::Reverse(h.priority()));
    }

    /// Unregister a handler by name, searching all points. Returns whether
    /// anything was removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let mut found = false;
        for handlers in self.hooks.values_mut() {
            let before = handlers.len();
            handlers.retain(|h| h.name() != name);
            found |= handlers.len() < before;
        }
        if found {
            debug!(name, "unregistered hook");
        }
        found
    }

    /// Handlers for one point, priority descending.
    #[must_use]
    pub fn handlers_for(&self, point: HookPoint) -> Vec<Arc<dyn HookHandler>> {
        self.hooks.get(&point).cloned().unwrap_or_default()
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hook_count", &self.count())
            .finish()
    }
}
