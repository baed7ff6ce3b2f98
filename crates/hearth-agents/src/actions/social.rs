//! Social handlers: `speak`, `invite`, `accept_invite`, `decline_invite`,
//! `join_conversation`, `leave_conversation`.
//!
//! These delegate to the social ledger for the state machines; the
//! handlers own the visibility checks (invite requires the invitee in
//! vision, join requires seeing the named participant) since they need the
//! world. Consent violations come back as failed results, never events.

use hearth_types::{Action, AgentName, EventKind, Privacy};
use hearth_social::AcceptOutcome;

use super::{ActionContext, ActionOutcome};

/// `speak`: add a turn to the actor's active conversation.
pub fn speak(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    text: &str,
) -> ActionOutcome {
    if text.trim().is_empty() {
        return ActionOutcome::fail(action, "You open your mouth, but say nothing.");
    }
    match ctx.state.social.speak(actor, text, ctx.tick) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok(conversation) => ActionOutcome::ok(
            action,
            "You speak.",
            vec![EventKind::TurnAdded {
                conversation,
                speaker: actor.clone(),
                text: text.to_owned(),
            }],
        ),
    }
}

/// `invite`: offer a conversation to an agent currently in vision.
pub fn invite(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    invitee: &AgentName,
    privacy: Privacy,
) -> ActionOutcome {
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    let Some(target) = ctx.state.roster.get(invitee).map(|a| a.position) else {
        return ActionOutcome::fail(action, format!("There is nobody called {invitee}."));
    };
    if !ctx.can_see(from, target) {
        return ActionOutcome::fail(action, format!("You cannot see {invitee} from here."));
    }

    match ctx.state.social.send_invitation(actor.clone(), invitee.clone(), privacy, ctx.tick) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok(invitation) => ActionOutcome::ok(
            action,
            format!("You invite {invitee} to talk."),
            vec![EventKind::InvitationSent {
                id: invitation.id,
                inviter: actor.clone(),
                invitee: invitee.clone(),
                privacy,
            }],
        ),
    }
}

/// `accept_invite`: answer the most recent pending invitation. Works from
/// any distance.
pub fn accept_invite(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
) -> ActionOutcome {
    match ctx.state.social.accept(actor, ctx.tick) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok(AcceptOutcome::Created {
            invitation,
            conversation,
        }) => {
            let participants = vec![invitation.inviter.clone(), actor.clone()];
            ActionOutcome::ok(
                action,
                format!("You accept {}'s invitation.", invitation.inviter),
                vec![
                    EventKind::InvitationAccepted {
                        id: invitation.id,
                        invitee: actor.clone(),
                    },
                    EventKind::ConversationStarted {
                        id: conversation,
                        privacy: invitation.privacy,
                        participants,
                    },
                ],
            )
        }
        Ok(AcceptOutcome::Joined {
            invitation,
            conversation,
        }) => ActionOutcome::ok(
            action,
            format!("You accept {}'s invitation and join the conversation.", invitation.inviter),
            vec![
                EventKind::InvitationAccepted {
                    id: invitation.id,
                    invitee: actor.clone(),
                },
                EventKind::ParticipantJoined {
                    conversation,
                    agent: actor.clone(),
                },
            ],
        ),
    }
}

/// `decline_invite`: turn the most recent pending invitation down.
pub fn decline_invite(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
) -> ActionOutcome {
    match ctx.state.social.decline(actor, ctx.tick) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok(invitation) => ActionOutcome::ok(
            action,
            format!("You decline {}'s invitation.", invitation.inviter),
            vec![EventKind::InvitationDeclined {
                id: invitation.id,
                invitee: actor.clone(),
            }],
        ),
    }
}

/// `join_conversation`: step into a public conversation by naming a
/// participant the actor can see.
pub fn join_conversation(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    participant: &AgentName,
) -> ActionOutcome {
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    let Some(target) = ctx.state.roster.get(participant).map(|a| a.position) else {
        return ActionOutcome::fail(action, format!("There is nobody called {participant}."));
    };
    if !ctx.can_see(from, target) {
        return ActionOutcome::fail(action, format!("You cannot see {participant} from here."));
    }

    match ctx.state.social.join_public(actor, participant, ctx.tick) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok(conversation) => ActionOutcome::ok(
            action,
            format!("You join the conversation beside {participant}."),
            vec![EventKind::ParticipantJoined {
                conversation,
                agent: actor.clone(),
            }],
        ),
    }
}

/// `leave_conversation`: step out; the last leaver ends the conversation.
pub fn leave_conversation(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
) -> ActionOutcome {
    match ctx.state.social.leave(actor, ctx.tick) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok((conversation, ended)) => {
            let mut events = vec![EventKind::ParticipantLeft {
                conversation,
                agent: actor.clone(),
            }];
            if ended {
                events.push(EventKind::ConversationEnded { conversation });
            }
            ActionOutcome::ok(action, "You step away from the conversation.", events)
        }
    }
}
