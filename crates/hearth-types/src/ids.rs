//! Type-safe identifier wrappers around [`Uuid`], plus the agent-name key.
//!
//! Opaque entities (world objects, items, conversations, invitations,
//! structures) carry strongly-typed UUID wrappers so identifiers cannot be
//! mixed at compile time. All IDs use UUID v7 (time-ordered) for efficient
//! database indexing. Agents are different: their unique display name is
//! their primary key everywhere (storage, events, conversations), wrapped in
//! [`AgentName`] so a name is never confused with arbitrary text.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a world object (sign or placed item).
    ObjectId
}

define_id! {
    /// Unique identifier for a unique crafted item in an inventory.
    ItemId
}

define_id! {
    /// Unique identifier for a conversation.
    ConversationId
}

define_id! {
    /// Unique identifier for a conversation invitation.
    InvitationId
}

define_id! {
    /// Unique identifier for a derived structure.
    StructureId
}

/// An agent's unique name -- the primary key for agents across the engine.
///
/// Names are opaque to the engine; uniqueness is enforced at roster
/// registration and by the `agents` table's primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(pub String);

impl AgentName {
    /// Wrap a name string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AgentName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for AgentName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let object = ObjectId::new();
        let conversation = ConversationId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(object.into_inner(), Uuid::nil());
        assert_ne!(conversation.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = InvitationId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<InvitationId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }

    #[test]
    fn agent_name_serializes_transparently() {
        let name = AgentName::from("Rowan");
        let json = serde_json::to_string(&name).ok();
        assert_eq!(json.as_deref(), Some("\"Rowan\""));
    }

    #[test]
    fn agent_name_orders_alphabetically() {
        assert!(AgentName::from("Ash") < AgentName::from("Birch"));
    }
}
