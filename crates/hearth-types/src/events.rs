//! The event union: every observable state change in the simulation.
//!
//! Events are the only way state changes. The pipeline accumulates them in
//! the tick context; the commit phase assigns sequence numbers, derives all
//! database mutations from them, and appends them to the audit log. The log
//! is never replayed -- recovery uses the database alone.

use serde::{Deserialize, Serialize};

use crate::agent::ResourceKind;
use crate::geometry::{Direction, Position};
use crate::ids::{AgentName, ConversationId, InvitationId, ObjectId, StructureId};
use crate::social::Privacy;
use crate::world::{Structure, Weather};

/// Why a sleeping agent woke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeReason {
    /// Time of day turned to morning.
    Morning,
    /// Another agent entered the sleeper's cell.
    Company,
    /// An observer forced the agent's turn.
    Forced,
}

/// Why a journey ended before arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptReason {
    /// Another agent came into view.
    CompanySighted,
    /// The remaining path was blocked (e.g. by a new wall).
    PathBlocked,
    /// An observer forced the agent's turn.
    Forced,
}

/// One observable state change, tagged by kind.
///
/// Every variant is applied to the database by a total match in the storage
/// layer; adding a variant without a storage arm is a compile error there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// An agent stepped from one cell to another.
    AgentMoved {
        /// Who moved.
        agent: AgentName,
        /// Previous cell.
        from: Position,
        /// New cell.
        to: Position,
    },
    /// An agent gathered a unit of a terrain resource.
    AgentGathered {
        /// Who gathered.
        agent: AgentName,
        /// Where.
        position: Position,
        /// What was gathered.
        resource: ResourceKind,
    },
    /// An agent fell asleep.
    AgentSlept {
        /// Who slept.
        agent: AgentName,
        /// Where.
        position: Position,
    },
    /// A sleeping agent woke.
    AgentWoke {
        /// Who woke.
        agent: AgentName,
        /// Why.
        reason: WakeReason,
    },
    /// Two agents became known to each other (co-visibility). Permanent.
    AgentsMet {
        /// One agent.
        a: AgentName,
        /// The other.
        b: AgentName,
    },
    /// An agent planned a journey and entered trance.
    JourneyStarted {
        /// Who.
        agent: AgentName,
        /// Planned destination.
        destination: Position,
        /// The full planned path, starting at the agent's position.
        path: Vec<Position>,
    },
    /// A journey ended before arrival; the trance is cleared.
    JourneyInterrupted {
        /// Who.
        agent: AgentName,
        /// Where the agent stopped.
        position: Position,
        /// Why.
        reason: InterruptReason,
    },
    /// A journey reached its destination; the trance is cleared.
    JourneyArrived {
        /// Who.
        agent: AgentName,
        /// The destination reached.
        destination: Position,
    },
    /// An agent picked up a world object.
    ItemTaken {
        /// Who.
        agent: AgentName,
        /// The object removed from the world.
        object: ObjectId,
        /// Where it stood.
        position: Position,
        /// Its kind label.
        item: String,
    },
    /// An agent dropped goods onto the ground as a world object.
    ItemDropped {
        /// Who.
        agent: AgentName,
        /// The object created.
        object: ObjectId,
        /// Where it now stands.
        position: Position,
        /// Its kind label.
        item: String,
    },
    /// Goods changed hands between adjacent agents.
    ItemGiven {
        /// The giver.
        giver: AgentName,
        /// The recipient.
        recipient: AgentName,
        /// The resource or item kind given.
        item: String,
    },
    /// An agent stood a carried item in the world.
    ItemPlaced {
        /// Who.
        agent: AgentName,
        /// The object created.
        object: ObjectId,
        /// Where it stands.
        position: Position,
        /// Its kind label.
        item: String,
    },
    /// A sign was written.
    SignWritten {
        /// The author.
        agent: AgentName,
        /// The sign object.
        object: ObjectId,
        /// Where it stands.
        position: Position,
        /// Full sign text.
        text: String,
    },
    /// A wall was placed on an edge (mirrored on the neighbour cell).
    WallPlaced {
        /// Who placed it.
        agent: AgentName,
        /// The cell whose edge was walled.
        position: Position,
        /// The walled edge.
        direction: Direction,
    },
    /// A wall was removed from an edge (mirrored on the neighbour cell).
    WallRemoved {
        /// Who removed it.
        agent: AgentName,
        /// The cell whose edge was cleared.
        position: Position,
        /// The cleared edge.
        direction: Direction,
    },
    /// A door was opened in an existing wall.
    DoorPlaced {
        /// Who placed it.
        agent: AgentName,
        /// The cell whose edge gained a door.
        position: Position,
        /// The doored edge.
        direction: Direction,
    },
    /// A cell was given a name.
    PlaceNamed {
        /// Who named it.
        agent: AgentName,
        /// The named cell.
        position: Position,
        /// The name.
        name: String,
    },
    /// A shelter macro completed (summary; individual walls and the door
    /// carry their own events).
    ShelterBuilt {
        /// The builder.
        agent: AgentName,
        /// The shelter's centre cell.
        center: Position,
        /// The side carrying the door.
        facing: Direction,
    },
    /// A flood-fill pass found a newly enclosed region.
    StructureFormed {
        /// The derived structure record.
        structure: Structure,
    },
    /// A previously detected structure is no longer enclosed.
    StructureDissolved {
        /// The structure that stopped being detected.
        id: StructureId,
    },
    /// A crafting recipe matched and produced output.
    CraftSucceeded {
        /// The crafter.
        agent: AgentName,
        /// Output kind label.
        output: String,
        /// Units produced (1 for unique items).
        quantity: u32,
        /// The inputs consumed.
        inputs: Vec<ResourceKind>,
        /// The produced unique item, when the output is not stackable.
        item: Option<crate::agent::Item>,
    },
    /// A conversation invitation was sent.
    InvitationSent {
        /// The invitation id.
        id: InvitationId,
        /// Who invited.
        inviter: AgentName,
        /// Who was invited.
        invitee: AgentName,
        /// Conversation privacy on acceptance.
        privacy: Privacy,
    },
    /// An invitation was accepted.
    InvitationAccepted {
        /// The invitation id.
        id: InvitationId,
        /// Who accepted.
        invitee: AgentName,
    },
    /// An invitation was declined.
    InvitationDeclined {
        /// The invitation id.
        id: InvitationId,
        /// Who declined.
        invitee: AgentName,
    },
    /// A pending invitation expired unanswered.
    InvitationExpired {
        /// The invitation id.
        id: InvitationId,
    },
    /// A conversation began.
    ConversationStarted {
        /// The conversation id.
        id: ConversationId,
        /// Its privacy.
        privacy: Privacy,
        /// Founding participants.
        participants: Vec<AgentName>,
    },
    /// A turn was spoken.
    TurnAdded {
        /// The conversation.
        conversation: ConversationId,
        /// Who spoke.
        speaker: AgentName,
        /// What was said.
        text: String,
    },
    /// An agent joined an ongoing conversation.
    ParticipantJoined {
        /// The conversation.
        conversation: ConversationId,
        /// Who joined.
        agent: AgentName,
    },
    /// An agent left a conversation.
    ParticipantLeft {
        /// The conversation.
        conversation: ConversationId,
        /// Who left.
        agent: AgentName,
    },
    /// A conversation's last participant left; the conversation is over.
    ConversationEnded {
        /// The conversation.
        conversation: ConversationId,
    },
    /// The weather changed.
    WeatherChanged {
        /// The new weather.
        weather: Weather,
    },
    /// An observer delivered a dream to a sleeping or waking agent.
    DreamDelivered {
        /// The dreamer.
        agent: AgentName,
        /// The dream text.
        text: String,
    },
    /// An observer injected a world event.
    ObserverTriggered {
        /// The injected text.
        text: String,
    },
    /// A reasoner session was opened for an agent. The session id is
    /// persisted so a restarted engine resumes the same session.
    SessionAssigned {
        /// The agent.
        agent: AgentName,
        /// The opaque session identity.
        session_id: String,
    },
    /// An agent was handed its perception for a turn. Advances the
    /// agent's `last_turn_tick` and, when in a conversation, the
    /// participant's unseen-turn cursor.
    PerceptionDelivered {
        /// Who received it.
        agent: AgentName,
        /// The active conversation whose context was included, if any.
        conversation: Option<ConversationId>,
    },
}

/// An event as committed: kind plus tick and a global sequence number.
///
/// Sequence numbers increase monotonically across the whole history and are
/// assigned only in the commit phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Global sequence number.
    pub seq: u64,
    /// The tick this event was produced in.
    pub tick: u64,
    /// The state change.
    #[serde(flatten)]
    pub kind: EventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_flat_type_tag() {
        let event = Event {
            seq: 7,
            tick: 3,
            kind: EventKind::AgentMoved {
                agent: AgentName::from("Rowan"),
                from: Position::new(5, 5),
                to: Position::new(5, 4),
            },
        };
        let value = serde_json::to_value(&event).ok();
        let value = value.unwrap_or_default();
        assert_eq!(value.get("type").and_then(serde_json::Value::as_str), Some("agent_moved"));
        assert_eq!(value.get("seq").and_then(serde_json::Value::as_u64), Some(7));
        assert_eq!(value.get("tick").and_then(serde_json::Value::as_u64), Some(3));
    }

    #[test]
    fn event_roundtrips_through_json() {
        let event = Event {
            seq: 1,
            tick: 1,
            kind: EventKind::InvitationExpired {
                id: InvitationId::new(),
            },
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        let back: Result<Event, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(event));
    }
}
