//! Error types for agent operations.

use hearth_types::{AgentName, Position, ResourceKind};

/// Errors that can occur during agent state operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The roster has no agent with this name.
    #[error("no agent named {name}")]
    UnknownAgent {
        /// The missing name.
        name: AgentName,
    },

    /// A name was registered twice.
    #[error("an agent named {name} already exists")]
    DuplicateAgent {
        /// The duplicated name.
        name: AgentName,
    },

    /// An inventory stack lacks the requested amount.
    #[error("not enough {resource}: requested {requested}, have {available}")]
    InsufficientResource {
        /// The short resource.
        resource: ResourceKind,
        /// How much was requested.
        requested: u32,
        /// How much is held.
        available: u32,
    },

    /// No carried item of the requested kind.
    #[error("no {kind} in inventory")]
    MissingItem {
        /// The absent item kind.
        kind: String,
    },

    /// A stack count would overflow.
    #[error("inventory arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// What overflowed.
        context: String,
    },

    /// No path exists between two positions on the passable subgraph.
    #[error("no path from {from} to {to}")]
    NoPath {
        /// Start position.
        from: Position,
        /// Goal position.
        to: Position,
    },
}
