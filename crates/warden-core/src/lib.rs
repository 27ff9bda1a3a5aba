//! # warden-core
//!
//! Foundation types for the Warden governance engine.
//!
//! This crate provides the shared vocabulary that all other Warden crates
//! depend on:
//!
//! - **Typed ids**: `EpicId`, `TaskId`, `SubtaskId`, `DelegationId`,
//!   `AnchorId`, `SessionId`, one wrapper type per entity
//! - **Stamp**: created/modified/validated timestamps with staleness derived
//!   on read, never trusted from storage
//! - **Constants**: package name and version

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod stamp;

pub use ids::{AnchorId, DelegationId, EpicId, SessionId, SubtaskId, TaskId};
pub use stamp::{STALE_AFTER_HOURS, Staleness, Stamp};
