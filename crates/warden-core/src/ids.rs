//! Typed identifiers for every governed entity.
//!
//! Each entity carries its own wrapper type around a UUID string, so the
//! compiler rejects a task id where a delegation id belongs and lookups
//! across the hierarchy cannot cross-wire. Generated ids are UUID v7:
//! time-ordered, so persisted collections stay in creation order without
//! a separate sequence field.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh time-ordered id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// The id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id! {
    /// Identifies an epic.
    EpicId
}

entity_id! {
    /// Identifies a task within an epic.
    TaskId
}

entity_id! {
    /// Identifies a subtask checklist item.
    SubtaskId
}

entity_id! {
    /// Identifies one recorded handoff between agent roles.
    DelegationId
}

entity_id! {
    /// Identifies a context anchor.
    AnchorId
}

entity_id! {
    /// Identifies an agent session.
    SessionId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
