//! The social ledger: all invitations and conversations.
//!
//! State machine per invitation:
//!
//! ```text
//!            invite                  accept
//!  (none) ────────▶ pending ────────▶ accepted (conversation created/joined)
//!                      │
//!                      │ decline            expire (age ≥ expiry_ticks)
//!                      ▼                         │
//!                   declined                  expired
//! ```
//!
//! Per participant within a conversation: `joined → left`. When the last
//! present participant leaves, the conversation ends.

use std::collections::BTreeMap;

use hearth_types::{
    AgentName, Conversation, ConversationId, ConversationTurn, Invitation, InvitationId,
    InvitationStatus, Participant, Privacy,
};
use tracing::debug;

use crate::error::SocialError;

/// What accepting an invitation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// A fresh conversation was created with inviter and invitee.
    Created {
        /// The accepted invitation.
        invitation: Invitation,
        /// The new conversation's id.
        conversation: ConversationId,
    },
    /// The invitee joined the inviter's ongoing conversation.
    Joined {
        /// The accepted invitation.
        invitation: Invitation,
        /// The joined conversation's id.
        conversation: ConversationId,
    },
}

/// All social state: invitations and conversations, past and present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SocialLedger {
    invitations: BTreeMap<InvitationId, Invitation>,
    conversations: BTreeMap<ConversationId, Conversation>,
}

impl SocialLedger {
    /// An empty ledger.
    pub const fn new() -> Self {
        Self {
            invitations: BTreeMap::new(),
            conversations: BTreeMap::new(),
        }
    }

    /// Rebuild a ledger from persisted parts.
    pub const fn from_parts(
        invitations: BTreeMap<InvitationId, Invitation>,
        conversations: BTreeMap<ConversationId, Conversation>,
    ) -> Self {
        Self {
            invitations,
            conversations,
        }
    }

    /// Every invitation ever sent.
    pub const fn invitations(&self) -> &BTreeMap<InvitationId, Invitation> {
        &self.invitations
    }

    /// Every conversation ever held.
    pub const fn conversations(&self) -> &BTreeMap<ConversationId, Conversation> {
        &self.conversations
    }

    /// A conversation by id.
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(&id)
    }

    /// The active conversation `agent` is present in, if any.
    pub fn active_conversation_of(&self, agent: &AgentName) -> Option<&Conversation> {
        self.conversations.values().find(|c| {
            c.is_active() && c.participant(agent).is_some_and(Participant::is_present)
        })
    }

    /// Pending invitations addressed to `invitee`, oldest first.
    pub fn pending_for(&self, invitee: &AgentName) -> Vec<&Invitation> {
        self.invitations
            .values()
            .filter(|i| i.status == InvitationStatus::Pending && &i.invitee == invitee)
            .collect()
    }

    /// Record a new pending invitation. The caller has already checked that
    /// the invitee is within the inviter's vision.
    pub fn send_invitation(
        &mut self,
        inviter: AgentName,
        invitee: AgentName,
        privacy: Privacy,
        tick: u64,
    ) -> Result<Invitation, SocialError> {
        if inviter == invitee {
            return Err(SocialError::SelfInvitation { agent: inviter });
        }
        let invitation = Invitation {
            id: InvitationId::new(),
            inviter,
            invitee,
            privacy,
            created_tick: tick,
            status: InvitationStatus::Pending,
        };
        debug!(id = %invitation.id, inviter = %invitation.inviter, invitee = %invitation.invitee, "invitation sent");
        self.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    /// Accept the most recent pending invitation addressed to `invitee`.
    ///
    /// If the inviter is in an active conversation the invitee joins it;
    /// otherwise a fresh conversation is created with both. Acceptance may
    /// happen from any distance.
    pub fn accept(
        &mut self,
        invitee: &AgentName,
        tick: u64,
    ) -> Result<AcceptOutcome, SocialError> {
        if self.active_conversation_of(invitee).is_some() {
            return Err(SocialError::AlreadyInConversation {
                agent: invitee.clone(),
            });
        }

        let invitation_id = self
            .pending_for(invitee)
            .iter()
            .max_by_key(|i| (i.created_tick, i.id))
            .map(|i| i.id)
            .ok_or_else(|| SocialError::NoPendingInvitation {
                agent: invitee.clone(),
            })?;

        let inviter = self
            .invitations
            .get(&invitation_id)
            .map(|i| i.inviter.clone())
            .ok_or_else(|| SocialError::NoPendingInvitation {
                agent: invitee.clone(),
            })?;

        // Check join feasibility before touching the invitation status so a
        // refused accept leaves everything untouched.
        let existing = self.active_conversation_of(&inviter).map(|c| c.id);
        if let Some(conversation_id) = existing
            && let Some(conversation) = self.conversations.get(&conversation_id)
            && conversation.participants.iter().any(|p| &p.name == invitee)
        {
            return Err(SocialError::RejoinRefused {
                agent: invitee.clone(),
            });
        }

        let invitation = self.set_status(invitation_id, InvitationStatus::Accepted)?;

        if let Some(conversation_id) = existing {
            self.add_participant(conversation_id, invitee.clone(), tick)?;
            debug!(id = %invitation.id, conversation = %conversation_id, "invitation accepted, joined");
            Ok(AcceptOutcome::Joined {
                invitation,
                conversation: conversation_id,
            })
        } else {
            let conversation = Conversation {
                id: ConversationId::new(),
                privacy: invitation.privacy,
                participants: vec![
                    Participant {
                        name: invitation.inviter.clone(),
                        joined_tick: tick,
                        left_tick: None,
                        last_turn_tick: tick,
                    },
                    Participant {
                        name: invitee.clone(),
                        joined_tick: tick,
                        left_tick: None,
                        last_turn_tick: tick,
                    },
                ],
                turns: Vec::new(),
                started_tick: tick,
                ended_tick: None,
            };
            let conversation_id = conversation.id;
            debug!(id = %invitation.id, conversation = %conversation_id, "invitation accepted, conversation created");
            self.conversations.insert(conversation_id, conversation);
            Ok(AcceptOutcome::Created {
                invitation,
                conversation: conversation_id,
            })
        }
    }

    /// Decline the most recent pending invitation addressed to `invitee`.
    pub fn decline(&mut self, invitee: &AgentName, _tick: u64) -> Result<Invitation, SocialError> {
        let invitation_id = self
            .pending_for(invitee)
            .iter()
            .max_by_key(|i| (i.created_tick, i.id))
            .map(|i| i.id)
            .ok_or_else(|| SocialError::NoPendingInvitation {
                agent: invitee.clone(),
            })?;
        self.set_status(invitation_id, InvitationStatus::Declined)
    }

    /// Expire every pending invitation whose age has reached
    /// `expiry_ticks`. Returns the expired invitations.
    pub fn expire_pending(&mut self, current_tick: u64, expiry_ticks: u64) -> Vec<Invitation> {
        let expired_ids: Vec<InvitationId> = self
            .invitations
            .values()
            .filter(|i| {
                i.status == InvitationStatus::Pending
                    && current_tick.saturating_sub(i.created_tick) >= expiry_ticks
            })
            .map(|i| i.id)
            .collect();

        let mut expired = Vec::new();
        for id in expired_ids {
            if let Ok(invitation) = self.set_status(id, InvitationStatus::Expired) {
                expired.push(invitation);
            }
        }
        expired
    }

    /// Join a public conversation by naming one of its present
    /// participants. The caller has already checked the joiner can see
    /// that participant.
    pub fn join_public(
        &mut self,
        joiner: &AgentName,
        participant: &AgentName,
        tick: u64,
    ) -> Result<ConversationId, SocialError> {
        if self.active_conversation_of(joiner).is_some() {
            return Err(SocialError::AlreadyInConversation {
                agent: joiner.clone(),
            });
        }
        let conversation = self
            .active_conversation_of(participant)
            .ok_or_else(|| SocialError::NoSuchParticipant {
                agent: participant.clone(),
            })?;
        if conversation.privacy == Privacy::Private {
            return Err(SocialError::PrivateConversation);
        }
        let conversation_id = conversation.id;
        self.add_participant(conversation_id, joiner.clone(), tick)?;
        Ok(conversation_id)
    }

    /// Append a spoken turn to `speaker`'s active conversation.
    pub fn speak(
        &mut self,
        speaker: &AgentName,
        text: impl Into<String>,
        tick: u64,
    ) -> Result<ConversationId, SocialError> {
        let conversation_id = self
            .active_conversation_of(speaker)
            .map(|c| c.id)
            .ok_or_else(|| SocialError::NotInConversation {
                agent: speaker.clone(),
            })?;
        if let Some(conversation) = self.conversations.get_mut(&conversation_id) {
            conversation.turns.push(ConversationTurn {
                speaker: speaker.clone(),
                text: text.into(),
                tick,
            });
        }
        Ok(conversation_id)
    }

    /// Leave the active conversation. Returns the conversation id and
    /// whether the departure ended it.
    pub fn leave(
        &mut self,
        agent: &AgentName,
        tick: u64,
    ) -> Result<(ConversationId, bool), SocialError> {
        let conversation_id = self
            .active_conversation_of(agent)
            .map(|c| c.id)
            .ok_or_else(|| SocialError::NotInConversation {
                agent: agent.clone(),
            })?;
        let conversation = self
            .conversations
            .get_mut(&conversation_id)
            .ok_or(SocialError::UnknownConversation {
                id: conversation_id,
            })?;

        if let Some(row) = conversation
            .participants
            .iter_mut()
            .find(|p| &p.name == agent && p.is_present())
        {
            row.left_tick = Some(tick);
        }

        let ended = conversation.present_participants().next().is_none();
        if ended {
            conversation.ended_tick = Some(tick);
            debug!(conversation = %conversation_id, "conversation ended");
        }
        Ok((conversation_id, ended))
    }

    /// Forcibly end a conversation (observer command). Every present
    /// participant is marked as having left.
    pub fn end_conversation(
        &mut self,
        id: ConversationId,
        tick: u64,
    ) -> Result<Vec<AgentName>, SocialError> {
        let conversation = self
            .conversations
            .get_mut(&id)
            .ok_or(SocialError::UnknownConversation { id })?;
        let mut removed = Vec::new();
        for row in &mut conversation.participants {
            if row.is_present() {
                row.left_tick = Some(tick);
                removed.push(row.name.clone());
            }
        }
        if conversation.ended_tick.is_none() {
            conversation.ended_tick = Some(tick);
        }
        Ok(removed)
    }

    /// Record that `agent` was handed the conversation context at `tick`;
    /// turns up to and including `tick` stop being "unseen".
    pub fn mark_seen(&mut self, agent: &AgentName, tick: u64) {
        let Some(conversation_id) = self.active_conversation_of(agent).map(|c| c.id) else {
            return;
        };
        if let Some(conversation) = self.conversations.get_mut(&conversation_id)
            && let Some(row) = conversation
                .participants
                .iter_mut()
                .find(|p| &p.name == agent && p.is_present())
        {
            row.last_turn_tick = tick;
        }
    }

    fn set_status(
        &mut self,
        id: InvitationId,
        status: InvitationStatus,
    ) -> Result<Invitation, SocialError> {
        let invitation = self
            .invitations
            .get_mut(&id)
            .ok_or(SocialError::NoPendingInvitation {
                agent: AgentName::from(""),
            })?;
        invitation.status = status;
        Ok(invitation.clone())
    }

    fn add_participant(
        &mut self,
        id: ConversationId,
        name: AgentName,
        tick: u64,
    ) -> Result<(), SocialError> {
        let conversation = self
            .conversations
            .get_mut(&id)
            .ok_or(SocialError::UnknownConversation { id })?;
        // joined -> left is one-way: no second membership row per agent.
        if conversation.participants.iter().any(|p| p.name == name) {
            return Err(SocialError::RejoinRefused { agent: name });
        }
        conversation.participants.push(Participant {
            name,
            joined_tick: tick,
            left_tick: None,
            last_turn_tick: tick,
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn names() -> (AgentName, AgentName, AgentName) {
        (
            AgentName::from("Ash"),
            AgentName::from("Birch"),
            AgentName::from("Cedar"),
        )
    }

    #[test]
    fn accept_creates_a_conversation_with_both() {
        let (ash, birch, _) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash.clone(), birch.clone(), Privacy::Public, 1);

        let outcome = ledger.accept(&birch, 2);
        let Ok(AcceptOutcome::Created { conversation, .. }) = outcome else {
            assert!(false, "expected a created conversation");
            return;
        };
        let convo = ledger.conversation(conversation);
        assert!(convo.is_some_and(Conversation::is_active));
        let present: Vec<String> = convo
            .map(|c| c.present_participants().map(ToString::to_string).collect())
            .unwrap_or_default();
        assert_eq!(present, vec![String::from("Ash"), String::from("Birch")]);
    }

    #[test]
    fn accept_without_pending_fails() {
        let (_, birch, _) = names();
        let mut ledger = SocialLedger::new();
        assert!(matches!(
            ledger.accept(&birch, 1),
            Err(SocialError::NoPendingInvitation { .. })
        ));
    }

    #[test]
    fn accept_joins_the_inviters_ongoing_conversation() {
        let (ash, birch, cedar) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash.clone(), birch.clone(), Privacy::Public, 1);
        let _ = ledger.accept(&birch, 2);

        let _ = ledger.send_invitation(ash.clone(), cedar.clone(), Privacy::Public, 3);
        let outcome = ledger.accept(&cedar, 4);
        assert!(matches!(outcome, Ok(AcceptOutcome::Joined { .. })));

        let convo = ledger.active_conversation_of(&ash);
        assert_eq!(convo.map(|c| c.present_participants().count()), Some(3));
    }

    #[test]
    fn an_agent_joins_at_most_one_conversation() {
        let (ash, birch, cedar) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash.clone(), birch.clone(), Privacy::Public, 1);
        let _ = ledger.accept(&birch, 2);

        // Cedar invites Birch, who is already busy.
        let _ = ledger.send_invitation(cedar, birch.clone(), Privacy::Public, 3);
        assert!(matches!(
            ledger.accept(&birch, 4),
            Err(SocialError::AlreadyInConversation { .. })
        ));
    }

    #[test]
    fn decline_is_terminal() {
        let (ash, birch, _) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash, birch.clone(), Privacy::Private, 1);
        let declined = ledger.decline(&birch, 2);
        assert_eq!(declined.ok().map(|i| i.status), Some(InvitationStatus::Declined));
        assert!(ledger.pending_for(&birch).is_empty());
    }

    #[test]
    fn expiry_hits_only_old_pending_invitations() {
        let (ash, birch, cedar) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash.clone(), birch, Privacy::Public, 1);
        let _ = ledger.send_invitation(ash, cedar, Privacy::Public, 2);

        let expired = ledger.expire_pending(3, 2);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired.first().map(|i| i.created_tick), Some(1));

        // Every remaining pending invitation is younger than the window.
        for invitation in ledger.invitations().values() {
            if invitation.status == InvitationStatus::Pending {
                assert!(3 - invitation.created_tick < 2);
            }
        }
    }

    #[test]
    fn private_conversations_refuse_joiners() {
        let (ash, birch, cedar) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash.clone(), birch, Privacy::Private, 1);
        let _ = ledger.accept(&AgentName::from("Birch"), 2);

        assert!(matches!(
            ledger.join_public(&cedar, &ash, 3),
            Err(SocialError::PrivateConversation)
        ));
    }

    #[test]
    fn last_leaver_ends_the_conversation() {
        let (ash, birch, _) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash.clone(), birch.clone(), Privacy::Public, 1);
        let _ = ledger.accept(&birch, 2);

        let left = ledger.leave(&ash, 3);
        assert_eq!(left.ok().map(|(_, ended)| ended), Some(false));
        let left = ledger.leave(&birch, 3);
        assert_eq!(left.ok().map(|(_, ended)| ended), Some(true));

        assert!(ledger.active_conversation_of(&birch).is_none());
        let convo = ledger.conversations().values().next();
        assert_eq!(convo.and_then(|c| c.ended_tick), Some(3));
    }

    #[test]
    fn speak_requires_membership_and_orders_turns() {
        let (ash, birch, cedar) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash.clone(), birch.clone(), Privacy::Public, 1);
        let _ = ledger.accept(&birch, 2);

        assert!(ledger.speak(&cedar, "hello?", 3).is_err());
        let _ = ledger.speak(&ash, "good morning", 3);
        let _ = ledger.speak(&birch, "morning", 4);

        let convo = ledger.active_conversation_of(&ash);
        let ticks: Vec<u64> = convo
            .map(|c| c.turns.iter().map(|t| t.tick).collect())
            .unwrap_or_default();
        assert_eq!(ticks, vec![3, 4]);
    }

    #[test]
    fn mark_seen_clears_unseen_turns() {
        let (ash, birch, _) = names();
        let mut ledger = SocialLedger::new();
        let _ = ledger.send_invitation(ash.clone(), birch.clone(), Privacy::Public, 1);
        let _ = ledger.accept(&birch, 2);
        let _ = ledger.speak(&ash, "psst", 3);

        let unseen = ledger
            .active_conversation_of(&birch)
            .map(|c| c.unseen_turns(&birch).len());
        assert_eq!(unseen, Some(1));

        ledger.mark_seen(&birch, 3);
        let unseen = ledger
            .active_conversation_of(&birch)
            .map(|c| c.unseen_turns(&birch).len());
        assert_eq!(unseen, Some(0));
    }
}
