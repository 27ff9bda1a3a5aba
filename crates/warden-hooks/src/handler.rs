//! Hook handler trait.

use async_trait::async_trait;

use crate::errors::HookError;
use crate::types::{HookContext, HookPoint, HookResult};

/// A lifecycle hook handler.
///
/// Handlers are registered in the [`HookRegistry`](crate::registry::HookRegistry)
/// and run by the [`HookEngine`](crate::engine::HookEngine) at their declared
/// point, highest priority first. The context is passed mutably so a handler
/// can rewrite outputs in place.
///
/// At [`HookPoint::ToolExecuteBefore`] an error or a `Block` result stops the
/// tool call. Everywhere else, errors are logged and treated as `Continue`.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Unique name for this handler. Registering another handler with the
    /// same name at the same point replaces it.
    fn name(&self) -> &str;

    /// Which lifecycle point this handler responds to.
    fn point(&self) -> HookPoint;

    /// Execution priority. Higher runs first. Default: 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Optional human-readable description.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Execute the handler against the given context.
    async fn handle(&self, context: &mut HookContext) -> Result<HookResult, HookError>;

    /// Optional filter. Return `false` to skip this handler for a context.
    fn should_handle(&self, _context: &HookContext) -> bool {
        true
    }
}
