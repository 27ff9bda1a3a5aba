//! Governance configuration: defaults, file deep-merge, env overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`WardenConfig::default()`]
//! 2. If `config.json` exists, deep-merge user values over defaults
//! 3. Apply `WARDEN_*` environment overrides (highest priority)
//!
//! Deep merge rules: objects merge recursively (source overrides target
//! per key), arrays and primitives are replaced entirely, nulls in source
//! are skipped. Invalid env values are ignored with a warning — a bad
//! override must never take the governance engine down.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Tunable governance parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WardenConfig {
    /// Anchors injected at compaction. Default: 5.
    pub anchor_budget: usize,
    /// Minutes before an unanswered delegation lapses. Default: 30.
    pub delegation_expiry_minutes: i64,
    /// Minutes before an idle active task is flagged stale. Default: 120.
    pub task_stale_minutes: i64,
    /// Whether to write a `.bak` copy before replacing a document. Default: true.
    pub backup_on_write: bool,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            anchor_budget: 5,
            delegation_expiry_minutes: 30,
            task_stale_minutes: 120,
            backup_on_write: true,
        }
    }
}

/// Recursive deep merge of two JSON values.
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Merge a user config document over the compiled defaults.
///
/// Unknown or mistyped fields degrade to defaults rather than failing.
#[must_use]
pub fn merge_config(user: Value) -> WardenConfig {
    let defaults = serde_json::to_value(WardenConfig::default())
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
    let merged = deep_merge(defaults, user);
    serde_json::from_value(merged).unwrap_or_else(|err| {
        warn!(%err, "config document did not match schema, using defaults");
        WardenConfig::default()
    })
}

/// Apply `WARDEN_*` environment overrides.
pub fn apply_env_overrides(config: &mut WardenConfig) {
    if let Some(v) = read_env_usize("WARDEN_ANCHOR_BUDGET", 0, 100) {
        config.anchor_budget = v;
    }
    if let Some(v) = read_env_i64("WARDEN_DELEGATION_EXPIRY_MINUTES", 1, 1440) {
        config.delegation_expiry_minutes = v;
    }
    if let Some(v) = read_env_i64("WARDEN_TASK_STALE_MINUTES", 1, 10_080) {
        config.task_stale_minutes = v;
    }
    if let Some(v) = read_env_bool("WARDEN_BACKUP_ON_WRITE") {
        config.backup_on_write = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
#[must_use]
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `usize` within a range.
#[must_use]
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as an `i64` within a range.
#[must_use]
pub fn parse_i64_range(val: &str, min: i64, max: i64) -> Option<i64> {
    let n: i64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

fn read_env_i64(name: &str, min: i64, max: i64) -> Option<i64> {
    let val = std::env::var(name).ok()?;
    let result = parse_i64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid i64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
