//! Hook dispatch.

use tracing::{debug, warn};

use crate::errors::HookError;
use crate::registry::HookRegistry;
use crate::types::{HookContext, HookResult};

/// Runs registered handlers at each lifecycle point.
///
/// Propagation policy is per point: at `ToolExecuteBefore` a handler error
/// or `Block` result stops dispatch and reaches the host, because the tool
/// must not run. At every other point a failing handler is logged and
/// skipped so observation hooks cannot take a session down.
#[derive(Debug)]
pub struct HookEngine {
    registry: HookRegistry,
}

impl HookEngine {
    /// Create an engine over a populated registry.
    #[must_use]
    pub fn new(registry: HookRegistry) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Mutable access for late registration.
    pub fn registry_mut(&mut self) -> &mut HookRegistry {
        &mut self.registry
    }

    /// Run all handlers for the context's point, priority order.
    ///
    /// Returns the first `Block` result, or `Continue` when every handler
    /// passed. Handlers may mutate the context in place; those mutations
    /// survive regardless of later handlers' results.
    pub async fn dispatch(&self, context: &mut HookContext) -> Result<HookResult, HookError> {
        let point = context.point();
        let handlers = self.registry.handlers_for(point);
        debug!(%point, handlers = handlers.len(), "dispatching hook");

        for handler in handlers {
            if !handler.should_handle(context) {
                continue;
            }
            match handler.handle(context).await {
                Ok(result) if result.is_blocked() => {
                    debug!(%point, handler = handler.name(), "hook blocked operation");
                    return Ok(result);
                }
                Ok(_) => {}
                Err(err) if point.errors_propagate() => {
                    return Err(err);
                }
                Err(err) => {
                    warn!(%point, handler = handler.name(), %err, "hook failed, continuing");
                }
            }
        }
        Ok(HookResult::continue_())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HookHandler;
    use crate::types::HookPoint;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warden_core::SessionId;

    enum Behavior {
        Continue,
        Block,
        Fail,
    }

    struct ScriptedHandler {
        name: String,
        point: HookPoint,
        priority: i32,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HookHandler for ScriptedHandler {
        fn name(&self) -> &str {
            &self.name
        }
        fn point(&self) -> HookPoint {
            self.point
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        async fn handle(&self, _context: &mut HookContext) -> Result<HookResult, HookError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Continue => Ok(HookResult::continue_()),
                Behavior::Block => Ok(HookResult::block("scripted block")),
                Behavior::Fail => Err(HookError::Internal("scripted failure".to_owned())),
            }
        }
    }

    fn scripted(
        name: &str,
        point: HookPoint,
        priority: i32,
        behavior: Behavior,
    ) -> (Arc<dyn HookHandler>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(ScriptedHandler {
            name: name.to_owned(),
            point,
            priority,
            behavior,
            calls: Arc::clone(&calls),
        });
        (handler, calls)
    }

    fn before_context() -> HookContext {
        HookContext::ToolExecuteBefore {
            session_id: SessionId::from("ses-1"),
            timestamp: "2026-01-01T00:00:00Z".parse().unwrap(),
            call_id: "call-1".to_owned(),
            tool: "bash".to_owned(),
            args: json!({}),
        }
    }

    fn event_context() -> HookContext {
        HookContext::Event {
            session_id: SessionId::from("ses-1"),
            timestamp: "2026-01-01T00:00:00Z".parse().unwrap(),
            name: "session.started".to_owned(),
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn block_stops_dispatch() {
        let mut registry = HookRegistry::new();
        let (blocker, _) = scripted("blocker", HookPoint::ToolExecuteBefore, 100, Behavior::Block);
        let (later, later_calls) =
            scripted("later", HookPoint::ToolExecuteBefore, 0, Behavior::Continue);
        registry.register(blocker);
        registry.register(later);

        let engine = HookEngine::new(registry);
        let result = engine.dispatch(&mut before_context()).await.unwrap();
        assert!(result.is_blocked());
        assert_eq!(later_calls.load(Ordering::SeqCst), 0, "lower priority never ran");
    }

    #[tokio::test]
    async fn before_errors_propagate() {
        let mut registry = HookRegistry::new();
        let (failer, _) = scripted("failer", HookPoint::ToolExecuteBefore, 0, Behavior::Fail);
        registry.register(failer);

        let engine = HookEngine::new(registry);
        assert!(engine.dispatch(&mut before_context()).await.is_err());
    }

    #[tokio::test]
    async fn other_point_errors_are_swallowed() {
        let mut registry = HookRegistry::new();
        let (failer, _) = scripted("failer", HookPoint::Event, 100, Behavior::Fail);
        let (after, after_calls) = scripted("after", HookPoint::Event, 0, Behavior::Continue);
        registry.register(failer);
        registry.register(after);

        let engine = HookEngine::new(registry);
        let result = engine.dispatch(&mut event_context()).await.unwrap();
        assert!(!result.is_blocked());
        assert_eq!(after_calls.load(Ordering::SeqCst), 1, "later handler still ran");
    }

    #[tokio::test]
    async fn handlers_run_in_priority_order() {
        let mut registry = HookRegistry::new();
        let (first, first_calls) =
            scripted("first", HookPoint::Event, 10, Behavior::Continue);
        let (second, second_calls) =
            scripted("second", HookPoint::Event, 5, Behavior::Continue);
        registry.register(second);
        registry.register(first);

        let engine = HookEngine::new(registry);
        let _ = engine.dispatch(&mut event_context()).await.unwrap();
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_registry_continues() {
        let engine = HookEngine::new(HookRegistry::new());
        let result = engine.dispatch(&mut event_context()).await.unwrap();
        assert!(!result.is_blocked());
    }
}
