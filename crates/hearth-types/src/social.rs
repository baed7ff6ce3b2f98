//! Social records: invitations and conversations.
//!
//! Conversations are consent-based. An agent enters a conversation only by
//! accepting an invitation or by joining a public conversation whose
//! participant it can see. Records are never deleted: invitations reach a
//! terminal status, conversations gain an `ended_tick`.

use serde::{Deserialize, Serialize};

use crate::ids::{AgentName, ConversationId, InvitationId};

/// Whether a conversation (or invitation) is open to visible joiners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    /// Joinable by anyone who can see a participant.
    Public,
    /// Joinable only via a direct invitation.
    Private,
}

/// The lifecycle state of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Awaiting a response.
    Pending,
    /// Accepted -- a conversation was created or joined.
    Accepted,
    /// Declined by the invitee.
    Declined,
    /// Expired unanswered after the configured number of ticks.
    Expired,
}

impl InvitationStatus {
    /// Whether this is a terminal state.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// An invitation from one agent to another to talk.
///
/// Created while the invitee is in the inviter's vision; may be answered
/// from any distance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Opaque invitation id.
    pub id: InvitationId,
    /// Who invited.
    pub inviter: AgentName,
    /// Who was invited.
    pub invitee: AgentName,
    /// Privacy of the conversation the invitation leads to.
    pub privacy: Privacy,
    /// Tick the invitation was created on.
    pub created_tick: u64,
    /// Lifecycle state.
    pub status: InvitationStatus,
}

/// One spoken turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke.
    pub speaker: AgentName,
    /// What was said.
    pub text: String,
    /// Tick the turn was spoken on.
    pub tick: u64,
}

/// A participant's membership row within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The participant's name.
    pub name: AgentName,
    /// Tick the participant joined on.
    pub joined_tick: u64,
    /// Tick the participant left on, if they have left.
    pub left_tick: Option<u64>,
    /// The tick at which this participant most recently received the
    /// conversation's state. Turns with `tick` greater than this are
    /// "unseen".
    pub last_turn_tick: u64,
}

impl Participant {
    /// Whether the participant is currently in the conversation.
    pub const fn is_present(&self) -> bool {
        self.left_tick.is_none()
    }
}

/// A conversation between two or more agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Opaque conversation id.
    pub id: ConversationId,
    /// Whether visible bystanders may join.
    pub privacy: Privacy,
    /// Membership rows in join order, including departed participants.
    pub participants: Vec<Participant>,
    /// Spoken turns in global order.
    pub turns: Vec<ConversationTurn>,
    /// Tick the conversation started on.
    pub started_tick: u64,
    /// Tick the conversation ended on. A conversation ends when its last
    /// participant leaves; it is not reopenable.
    pub ended_tick: Option<u64>,
}

impl Conversation {
    /// Whether the conversation is still active.
    pub const fn is_active(&self) -> bool {
        self.ended_tick.is_none()
    }

    /// Names of participants currently present.
    pub fn present_participants(&self) -> impl Iterator<Item = &AgentName> {
        self.participants.iter().filter(|p| p.is_present()).map(|p| &p.name)
    }

    /// The membership row for `name`, present or departed.
    pub fn participant(&self, name: &AgentName) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.name == name)
    }

    /// Turns the named participant has not yet been shown.
    pub fn unseen_turns(&self, name: &AgentName) -> Vec<&ConversationTurn> {
        let Some(participant) = self.participant(name) else {
            return Vec::new();
        };
        self.turns
            .iter()
            .filter(|turn| turn.tick > participant.last_turn_tick)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_party(a: &str, b: &str) -> Conversation {
        Conversation {
            id: ConversationId::new(),
            privacy: Privacy::Public,
            participants: vec![
                Participant {
                    name: AgentName::from(a),
                    joined_tick: 3,
                    left_tick: None,
                    last_turn_tick: 3,
                },
                Participant {
                    name: AgentName::from(b),
                    joined_tick: 3,
                    left_tick: None,
                    last_turn_tick: 3,
                },
            ],
            turns: Vec::new(),
            started_tick: 3,
            ended_tick: None,
        }
    }

    #[test]
    fn pending_is_the_only_non_terminal_status() {
        assert!(!InvitationStatus::Pending.is_terminal());
        assert!(InvitationStatus::Accepted.is_terminal());
        assert!(InvitationStatus::Declined.is_terminal());
        assert!(InvitationStatus::Expired.is_terminal());
    }

    #[test]
    fn unseen_turns_are_those_after_last_turn_tick() {
        let mut convo = two_party("Ash", "Birch");
        convo.turns.push(ConversationTurn {
            speaker: AgentName::from("Ash"),
            text: String::from("hello"),
            tick: 4,
        });
        convo.turns.push(ConversationTurn {
            speaker: AgentName::from("Birch"),
            text: String::from("hi"),
            tick: 5,
        });

        let unseen = convo.unseen_turns(&AgentName::from("Birch"));
        assert_eq!(unseen.len(), 2);

        if let Some(p) = convo.participants.get_mut(1) {
            p.last_turn_tick = 4;
        }
        let unseen = convo.unseen_turns(&AgentName::from("Birch"));
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen.first().map(|t| t.tick), Some(5));
    }

    #[test]
    fn departed_participants_are_not_present() {
        let mut convo = two_party("Ash", "Birch");
        if let Some(p) = convo.participants.get_mut(0) {
            p.left_tick = Some(6);
        }
        let present: Vec<&AgentName> = convo.present_participants().collect();
        assert_eq!(present, vec![&AgentName::from("Birch")]);
    }

    #[test]
    fn non_participant_has_no_unseen_turns() {
        let convo = two_party("Ash", "Birch");
        assert!(convo.unseen_turns(&AgentName::from("Cedar")).is_empty());
    }
}
