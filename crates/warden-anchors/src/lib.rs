//! # warden-anchors
//!
//! Context anchors: small prioritized facts that should survive a
//! context-compaction event. This crate holds the append-only store, the
//! scoring and budgeted-selection algorithm, and the builder for the
//! governance directive injected when the host compacts.

#![deny(unsafe_code)]

pub mod directive;
pub mod select;
pub mod store;
pub mod types;

pub use directive::{
    DEFAULT_ANCHOR_BUDGET, DIRECTIVE_CHAR_BUDGET, DirectiveInput, TRUNCATION_MARKER,
    build_directive,
};
pub use select::{score, select_anchors};
pub use store::{AnchorStore, NewAnchor};
pub use types::{Anchor, AnchorKind, AnchorPriority, MAX_ANCHOR_CONTENT};
