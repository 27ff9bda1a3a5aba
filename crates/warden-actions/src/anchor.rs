//! The anchor action: record and list context-preservation facts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;
use warden_anchors::{AnchorKind, AnchorPriority, AnchorStore, NewAnchor};
use warden_store::StateStore;

use crate::action::WardenAction;
use crate::report::{render, render_instruction};

/// Actions the anchor tool routes.
pub const VALID_ANCHOR_ACTIONS: &[&str] = &["add", "list"];

const ADD_EXAMPLE: &str =
    r#"{"action":"add","content":"chose sqlite over flat files","kind":"decision","priority":"high"}"#;

/// The anchor tool exposed to agents.
pub struct AnchorAction {
    store: Arc<StateStore>,
}

impl AnchorAction {
    /// Create the action over a shared store.
    #[must_use]
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    fn add(&self, args: &Value, now: DateTime<Utc>) -> Result<Vec<String>, String> {
        let content = args
            .get("content")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                render_instruction("the add action needs a \"content\" field.", ADD_EXAMPLE)
            })?;
        let kind = match args.get("kind").and_then(Value::as_str) {
            Some(raw) => parse_enum::<AnchorKind>(raw).ok_or_else(|| {
                render_instruction(
                    &format!(
                        "\"{raw}\" is not an anchor kind. Use decision, context, checkpoint, \
                         error, or attention."
                    ),
                    ADD_EXAMPLE,
                )
            })?,
            None => AnchorKind::Context,
        };
        let priority = match args.get("priority").and_then(Value::as_str) {
            Some(raw) => parse_enum::<AnchorPriority>(raw).ok_or_else(|| {
                render_instruction(
                    &format!(
                        "\"{raw}\" is not an anchor priority. Use critical, high, medium, or low."
                    ),
                    ADD_EXAMPLE,
                )
            })?,
            None => AnchorPriority::Medium,
        };
        let traversal_depth = args
            .get("traversalDepth")
            .and_then(Value::as_u64)
            .and_then(|depth| u32::try_from(depth).ok())
            .unwrap_or(0);

        let anchors = AnchorStore::with_anchors(self.store.load_anchors());
        let anchor = anchors.add(
            NewAnchor {
                kind,
                content: content.to_owned(),
                priority,
                traversal_depth,
                entity_type: opt_string(args, "entityType"),
                focus_target: opt_string(args, "focusTarget"),
                focus_reason: opt_string(args, "focusReason"),
            },
            now,
        );
        if let Err(err) = self.store.save_anchors(&anchors.list()) {
            warn!(%err, "anchors not persisted");
        }
        Ok(vec![
            format!("Anchor recorded ({}/{}).", anchor.priority, anchor.kind),
            format!("Anchor id: {}", anchor.id),
        ])
    }

    fn list(&self, now: DateTime<Utc>) -> Vec<String> {
        let anchors = self.store.load_anchors();
        if anchors.is_empty() {
            return vec!["No anchors recorded.".to_owned()];
        }
        let mut lines = vec![format!("{} anchors, oldest first:", anchors.len())];
        for anchor in &anchors {
            let mut line = format!("[{}/{}] {}", anchor.priority, anchor.kind, anchor.content);
            if anchor.stamp.is_stale(now) {
                line.push_str(" (stale)");
            }
            lines.push(line);
        }
        lines
    }
}

#[async_trait]
impl WardenAction for AnchorAction {
    fn name(&self) -> &str {
        "anchor"
    }

    fn description(&self) -> &str {
        "Record prioritized facts that survive context compaction."
    }

    async fn execute(&self, args: Value, now: DateTime<Utc>) -> String {
        let Some(action) = args.get("action").and_then(Value::as_str) else {
            return render_instruction(
                &format!(
                    "the anchor tool needs an \"action\" field. Valid actions: {}.",
                    VALID_ANCHOR_ACTIONS.join(", ")
                ),
                ADD_EXAMPLE,
            );
        };
        let lines = match action {
            "add" => match self.add(&args, now) {
                Ok(lines) => lines,
                Err(instruction) => return instruction,
            },
            "list" => self.list(now),
            other => {
                return render_instruction(
                    &format!(
                        "\"{other}\" is not an anchor action. Valid actions: {}.",
                        VALID_ANCHOR_ACTIONS.join(", ")
                    ),
                    ADD_EXAMPLE,
                );
            }
        };
        render(&lines, &self.store.read_state(), now)
    }
}

fn opt_string(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(Value::String(raw.to_lowercase())).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::GOVERNANCE_FOOTER;
    use serde_json::json;
    use warden_anchors::MAX_ANCHOR_CONTENT;

    fn now() -> DateTime<Utc> {
        "2026-02-01T00:00:00Z".parse().unwrap()
    }

    struct Fixture {
        action: AnchorAction,
        store: Arc<StateStore>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()).unwrap());
        Fixture {
            action: AnchorAction::new(Arc::clone(&store)),
            store,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn add_persists_the_anchor() {
        let fx = fixture();
        let reply = fx
            .action
            .execute(
                json!({
                    "action": "add",
                    "content": "the importer owns file encoding",
                    "kind": "decision",
                    "priority": "high"
                }),
                now(),
            )
            .await;
        assert!(reply.contains("Anchor recorded (high/decision)."));
        assert!(reply.ends_with(GOVERNANCE_FOOTER));

        let persisted = fx.store.load_anchors();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].content, "the importer owns file encoding");
    }

    #[tokio::test]
    async fn add_defaults_kind_and_priority() {
        let fx = fixture();
        let reply = fx
            .action
            .execute(json!({"action": "add", "content": "remember"}), now())
            .await;
        assert!(reply.contains("Anchor recorded (medium/context)."));
    }

    #[tokio::test]
    async fn over_long_content_is_clamped() {
        let fx = fixture();
        let long = "x".repeat(MAX_ANCHOR_CONTENT + 100);
        let _ = fx
            .action
            .execute(json!({"action": "add", "content": long}), now())
            .await;
        let persisted = fx.store.load_anchors();
        assert_eq!(persisted[0].content.chars().count(), MAX_ANCHOR_CONTENT);
    }

    #[tokio::test]
    async fn invalid_kind_is_instructed() {
        let fx = fixture();
        let reply = fx
            .action
            .execute(
                json!({"action": "add", "content": "x", "kind": "vibes"}),
                now(),
            )
            .await;
        insta::assert_snapshot!(reply, @r#"
        "vibes" is not an anchor kind. Use decision, context, checkpoint, error, or attention.
        Example: {"action":"add","content":"chose sqlite over flat files","kind":"decision","priority":"high"}

        -- warden: writes require an active task; complete tasks with evidence.
        "#);
        assert!(fx.store.load_anchors().is_empty(), "nothing persisted");
    }

    #[tokio::test]
    async fn list_shows_anchors_oldest_first() {
        let fx = fixture();
        let empty = fx.action.execute(json!({"action": "list"}), now()).await;
        assert!(empty.contains("No anchors recorded."));

        let _ = fx
            .action
            .execute(json!({"action": "add", "content": "first"}), now())
            .await;
        let _ = fx
            .action
            .execute(
                json!({"action": "add", "content": "second", "priority": "critical", "kind": "error"}),
                now(),
            )
            .await;

        let reply = fx.action.execute(json!({"action": "list"}), now()).await;
        assert!(reply.contains("2 anchors"));
        let first = reply.find("[medium/context] first").unwrap();
        let second = reply.find("[critical/error] second").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn unknown_action_is_instructed() {
        let fx = fixture();
        let reply = fx.action.execute(json!({"action": "purge"}), now()).await;
        assert!(reply.contains("\"purge\" is not an anchor action"));
        assert!(reply.contains("add, list"));
    }
}
