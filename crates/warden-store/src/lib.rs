//! # warden-store
//!
//! JSON persistence for Warden governance documents. One `.warden/`
//! directory per project holds the governance snapshot, the anchor list,
//! the user configuration, and per-session metadata.
//!
//! Durability posture: writes are atomic (temp file then rename, optional
//! `.bak`), reads degrade to schema defaults on missing or corrupt files.
//! Governance must keep running on a bad disk day.

#![deny(unsafe_code)]

pub mod config;
pub mod documents;
pub mod errors;
pub mod store;

pub use config::{WardenConfig, deep_merge, merge_config};
pub use documents::SessionDocument;
pub use errors::{Result, StoreError};
pub use store::StateStore;
