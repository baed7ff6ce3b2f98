//! Error types for social operations.
//!
//! Every variant maps to a failed `ActionResult` with an explanatory
//! message; none of them emit events.

use hearth_types::AgentName;

/// Errors that can occur in invitation and conversation operations.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    /// An accept or decline was attempted with nothing pending.
    #[error("{agent} has no pending invitation")]
    NoPendingInvitation {
        /// The agent who tried to respond.
        agent: AgentName,
    },

    /// The agent is already in an active conversation.
    #[error("{agent} is already in a conversation")]
    AlreadyInConversation {
        /// The busy agent.
        agent: AgentName,
    },

    /// The agent is not in any active conversation.
    #[error("{agent} is not in a conversation")]
    NotInConversation {
        /// The conversationless agent.
        agent: AgentName,
    },

    /// The named agent is not a participant of any active conversation.
    #[error("{agent} is not part of an ongoing conversation")]
    NoSuchParticipant {
        /// The named non-participant.
        agent: AgentName,
    },

    /// A join was attempted on a private conversation.
    #[error("that conversation is private; an invitation is needed")]
    PrivateConversation,

    /// An agent tried to invite itself.
    #[error("{agent} cannot invite themself")]
    SelfInvitation {
        /// The agent.
        agent: AgentName,
    },

    /// An agent who left a conversation tried to come back to it. The
    /// participant state machine is one-way: joined, then left.
    #[error("{agent} already left that conversation")]
    RejoinRefused {
        /// The returning agent.
        agent: AgentName,
    },

    /// A conversation id was not found. Indicates a stale observer command
    /// or a bug.
    #[error("unknown conversation {id}")]
    UnknownConversation {
        /// The missing id.
        id: hearth_types::ConversationId,
    },
}
