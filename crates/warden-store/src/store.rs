//! Filesystem store for governance documents.
//!
//! Everything lives under a `.warden/` directory:
//!
//! ```text
//! .warden/
//!   state.json        governance snapshot (epics, tasks, delegations)
//!   config.json       user overrides for WardenConfig
//!   anchors.json      context anchors
//!   sessions/
//!     <session>.json  per-session metadata
//! ```
//!
//! Reads never fail: a missing or corrupt document falls back to its
//! schema default with a warning, so one bad file cannot wedge the
//! engine. Writes go through a temp-file-then-rename so a crash mid-write
//! leaves the previous document intact, with an optional `.bak` copy of
//! the replaced version.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use warden_anchors::Anchor;
use warden_core::SessionId;
use warden_core::constants::DATA_DIR_NAME;
use warden_tasks::GovernanceState;

use crate::config::{WardenConfig, apply_env_overrides, merge_config};
use crate::documents::SessionDocument;
use crate::errors::Result;

const STATE_FILE: &str = "state.json";
const CONFIG_FILE: &str = "config.json";
const ANCHORS_FILE: &str = "anchors.json";
const SESSIONS_DIR: &str = "sessions";

/// Handle to one `.warden/` data directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
    config: WardenConfig,
}

impl StateStore {
    /// Open (creating if needed) the data directory under `base_dir` and
    /// load configuration: defaults, then `config.json`, then `WARDEN_*`
    /// environment overrides.
    pub fn open(base_dir: &Path) -> Result<Self> {
        let root = base_dir.join(DATA_DIR_NAME);
        fs::create_dir_all(root.join(SESSIONS_DIR))?;

        let mut config = match read_json(&root.join(CONFIG_FILE)) {
            Some(value) => merge_config(value),
            None => WardenConfig::default(),
        };
        apply_env_overrides(&mut config);

        debug!(root = %root.display(), "opened governance store");
        Ok(Self { root, config })
    }

    /// The effective configuration loaded at open time.
    #[must_use]
    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Path of the data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the governance snapshot, falling back to an empty default.
    #[must_use]
    pub fn read_state(&self) -> GovernanceState {
        self.read_or_default(STATE_FILE)
    }

    /// Persist the governance snapshot atomically.
    pub fn write_state(&self, state: &GovernanceState) -> Result<()> {
        self.write_document(&self.root.join(STATE_FILE), state)
    }

    /// Read all anchors, falling back to an empty list.
    #[must_use]
    pub fn load_anchors(&self) -> Vec<Anchor> {
        self.read_or_default(ANCHORS_FILE)
    }

    /// Persist the full anchor list atomically.
    pub fn save_anchors(&self, anchors: &[Anchor]) -> Result<()> {
        self.write_document(&self.root.join(ANCHORS_FILE), &anchors)
    }

    /// Read one session document, if present and parseable.
    #[must_use]
    pub fn load_session(&self, session_id: &SessionId) -> Option<SessionDocument> {
        let path = self.session_path(session_id);
        let value = read_json(&path)?;
        match serde_json::from_value(value) {
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!(path = %path.display(), %err, "session document unreadable, ignoring");
                None
            }
        }
    }

    /// Persist one session document atomically.
    pub fn save_session(&self, doc: &SessionDocument) -> Result<()> {
        self.write_document(&self.session_path(&doc.session_id), doc)
    }

    /// Ids of all sessions with a stored document.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionId> {
        let Ok(entries) = fs::read_dir(self.root.join(SESSIONS_DIR)) else {
            return Vec::new();
        };
        let mut ids: Vec<SessionId> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stem = name.strip_suffix(".json")?;
                Some(SessionId::from(stem))
            })
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    fn session_path(&self, session_id: &SessionId) -> PathBuf {
        self.root
            .join(SESSIONS_DIR)
            .join(format!("{}.json", session_id.as_str()))
    }

    fn read_or_default<T>(&self, file: &str) -> T
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let path = self.root.join(file);
        let Some(value) = read_json(&path) else {
            return T::default();
        };
        serde_json::from_value(value).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "document did not match schema, using default");
            T::default()
        })
    }

    /// Serialize and replace a document atomically. Writes the bytes to a
    /// sibling temp file first, then renames over the target. When
    /// `backup_on_write` is set and a previous version exists, that
    /// version is copied to `<name>.bak` before the rename.
    fn write_document<T: Serialize>(&self, path: &Path, document: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)?;

        if self.config.backup_on_write && path.exists() {
            let backup = path.with_extension("json.bak");
            if let Err(err) = fs::copy(path, &backup) {
                warn!(path = %path.display(), %err, "backup copy failed, continuing");
            }
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Read and parse a JSON file. `None` on missing file or invalid JSON,
/// with a warning for the latter.
fn read_json(path: &Path) -> Option<Value> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), %err, "document unreadable, ignoring");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), %err, "document is not valid json, ignoring");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use warden_anchors::{AnchorKind, AnchorPriority};
    use warden_core::{AnchorId, Stamp};

    fn now() -> DateTime<Utc> {
        "2026-02-01T00:00:00Z".parse().unwrap()
    }

    fn open_store(dir: &tempfile::TempDir) -> StateStore {
        StateStore::open(dir.path()).unwrap()
    }

    #[test]
    fn missing_state_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let state = store.read_state();
        assert!(state.epics.is_empty());
        assert!(state.active_epic_id.is_none());
    }

    #[test]
    fn state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let mut state = GovernanceState::default();
        state.active_task_id = None;
        store.write_state(&state).unwrap();

        assert_eq!(store.read_state(), state);
    }

    #[test]
    fn corrupt_state_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        fs::write(store.root().join("state.json"), "{not json").unwrap();

        let state = store.read_state();
        assert_eq!(state, GovernanceState::default());
    }

    #[test]
    fn write_leaves_backup_of_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store.write_state(&GovernanceState::default()).unwrap();
        let mut second = GovernanceState::default();
        second.schema_version = 1;
        store.write_state(&second).unwrap();

        assert!(store.root().join("state.json.bak").exists());
        assert!(!store.root().join("state.json.tmp").exists(), "temp file renamed away");
    }

    #[test]
    fn anchors_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.load_anchors().is_empty());

        let anchors = vec![Anchor {
            id: AnchorId::new(),
            kind: AnchorKind::Decision,
            content: "ship behind a flag".to_owned(),
            priority: AnchorPriority::High,
            stamp: Stamp::at(now()),
            traversal_depth: 0,
            entity_type: None,
            focus_target: None,
            focus_reason: None,
        }];
        store.save_anchors(&anchors).unwrap();
        assert_eq!(store.load_anchors(), anchors);
    }

    #[test]
    fn sessions_are_stored_per_id_and_listed() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let first = SessionDocument::start(SessionId::new(), now());
        let second = SessionDocument::start(SessionId::new(), now());
        store.save_session(&first).unwrap();
        store.save_session(&second).unwrap();

        assert_eq!(store.load_session(&first.session_id), Some(first.clone()));
        assert!(store.load_session(&SessionId::new()).is_none());

        let listed = store.list_sessions();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&first.session_id));
        assert!(listed.contains(&second.session_id));
    }

    #[test]
    fn config_defaults_when_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert_eq!(store.config().anchor_budget, 5);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(DATA_DIR_NAME);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("config.json"), r#"{"anchorBudget": 3}"#).unwrap();

        let store = open_store(&dir);
        assert_eq!(store.config().anchor_budget, 3);
        assert_eq!(store.config().task_stale_minutes, 120);
    }

    #[test]
    fn corrupt_config_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(DATA_DIR_NAME);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("config.json"), "?!").unwrap();

        let store = open_store(&dir);
        assert_eq!(store.config(), &WardenConfig::default());
    }
}
