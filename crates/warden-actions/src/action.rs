//! The callable-action seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A named action an agent calls with a flat JSON argument bag.
///
/// Actions never fail at the call boundary: malformed input comes back as
/// instruction text with a corrected example, and every reply closes with
/// the governance footer.
#[async_trait]
pub trait WardenAction: Send + Sync {
    /// Stable name the host routes calls on.
    fn name(&self) -> &str;

    /// One-line description for tool listings.
    fn description(&self) -> &str;

    /// Run the action against the shared store and produce the reply text.
    async fn execute(&self, args: Value, now: DateTime<Utc>) -> String;
}
