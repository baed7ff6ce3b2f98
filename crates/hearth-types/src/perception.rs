//! Perception payload delivered to an agent at the start of its turn.
//!
//! The perception is the **only** information an agent receives about the
//! world. If something is not in the perception, the agent does not know
//! about it. Vision is clamped to the world bounds and reduced at night.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::ResourceKind;
use crate::geometry::{CompassPoint, Direction, Position};
use crate::ids::AgentName;
use crate::social::Privacy;
use crate::world::{Terrain, TimeOfDay, Weather};

/// The complete perception payload for one agent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perception {
    /// Current tick number.
    pub tick: u64,
    /// Current time of day.
    pub time_of_day: TimeOfDay,
    /// Current weather.
    pub weather: Weather,
    /// The agent's own state summary.
    pub self_state: SelfView,
    /// The visible patch of grid, clamped to world bounds.
    pub grid: GridView,
    /// Other agents within effective vision.
    pub visible_agents: Vec<VisibleAgent>,
    /// World objects within effective vision.
    pub visible_objects: Vec<VisibleObject>,
    /// Journey state, if the agent is in trance.
    pub journey: Option<JourneyView>,
    /// The agent's active conversation, with its unseen turns.
    pub conversation: Option<ConversationView>,
    /// Invitations awaiting this agent's answer.
    pub pending_invitations: Vec<InvitationView>,
    /// Dreams delivered by the observer since the agent's last turn.
    pub dreams: Vec<String>,
    /// System notices (world events, wake reasons, interrupts).
    pub notices: Vec<String>,
}

/// The agent's own state as presented in perception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfView {
    /// The agent's name.
    pub name: AgentName,
    /// Where the agent stands.
    pub position: Position,
    /// Opaque personality text.
    pub personality: String,
    /// Stackable resources carried.
    pub stacks: BTreeMap<ResourceKind, u32>,
    /// Kinds of unique items carried.
    pub items: Vec<String>,
}

/// A rectangular patch of visible cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridView {
    /// North-west corner of the patch.
    pub origin: Position,
    /// Patch width in cells.
    pub width: u32,
    /// Patch height in cells.
    pub height: u32,
    /// Per-cell views in row-major order. Only cells inside the world
    /// bounds appear -- out-of-range cells never do.
    pub cells: Vec<CellView>,
}

/// One visible cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    /// The cell position.
    pub position: Position,
    /// Its terrain.
    pub terrain: Terrain,
    /// Edges carrying walls.
    pub walls: Vec<Direction>,
    /// Walled edges carrying doors.
    pub doors: Vec<Direction>,
    /// Name of the place, if one was given.
    pub place_name: Option<String>,
}

/// Another agent in view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleAgent {
    /// The other agent's name.
    pub name: AgentName,
    /// Where they stand.
    pub position: Position,
    /// Whether they are asleep.
    pub sleeping: bool,
}

/// A world object in view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleObject {
    /// Where it stands.
    pub position: Position,
    /// Short label (e.g. `sign (by Rowan)`, `stone_axe`).
    pub label: String,
}

/// Journey state shown to a journeying agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyView {
    /// The destination.
    pub destination: Position,
    /// Steps left until arrival.
    pub remaining_steps: u32,
}

/// One conversation turn as shown in perception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnView {
    /// Who spoke.
    pub speaker: AgentName,
    /// What was said.
    pub text: String,
    /// When.
    pub tick: u64,
}

/// The agent's active conversation as shown in perception. The internal
/// conversation id is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationView {
    /// Conversation privacy.
    pub privacy: Privacy,
    /// Participants currently present.
    pub participants: Vec<AgentName>,
    /// Turns spoken since this agent last received the conversation.
    pub unseen_turns: Vec<TurnView>,
}

/// A pending invitation as shown to its invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationView {
    /// Who invited.
    pub inviter: AgentName,
    /// Privacy of the conversation on acceptance.
    pub privacy: Privacy,
    /// Tick the invitation was created.
    pub created_tick: u64,
}

/// Chebyshev distance bucket used by presence sensing. Intentionally coarse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBucket {
    /// Within 10 cells.
    Nearby,
    /// 11 to 30 cells.
    Far,
    /// 31 cells or more.
    VeryFar,
}

impl DistanceBucket {
    /// Bucket a Chebyshev distance.
    pub const fn from_chebyshev(distance: u32) -> Self {
        if distance <= 10 {
            Self::Nearby
        } else if distance <= 30 {
            Self::Far
        } else {
            Self::VeryFar
        }
    }
}

/// One entry of a `sense_others` reading: a known agent's rough bearing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceReading {
    /// The known agent sensed.
    pub other: AgentName,
    /// Eight-way bearing, or `None` when co-located.
    pub direction: Option<CompassPoint>,
    /// Coarse distance.
    pub distance: DistanceBucket,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_buckets_are_inclusive_at_boundaries() {
        assert_eq!(DistanceBucket::from_chebyshev(0), DistanceBucket::Nearby);
        assert_eq!(DistanceBucket::from_chebyshev(10), DistanceBucket::Nearby);
        assert_eq!(DistanceBucket::from_chebyshev(11), DistanceBucket::Far);
        assert_eq!(DistanceBucket::from_chebyshev(30), DistanceBucket::Far);
        assert_eq!(DistanceBucket::from_chebyshev(31), DistanceBucket::VeryFar);
    }

    #[test]
    fn perception_roundtrips_through_json() {
        let perception = Perception {
            tick: 4,
            time_of_day: TimeOfDay::Morning,
            weather: Weather::Clear,
            self_state: SelfView {
                name: AgentName::from("Rowan"),
                position: Position::new(2, 2),
                personality: String::from("curious"),
                stacks: BTreeMap::new(),
                items: Vec::new(),
            },
            grid: GridView {
                origin: Position::new(0, 0),
                width: 5,
                height: 5,
                cells: Vec::new(),
            },
            visible_agents: Vec::new(),
            visible_objects: Vec::new(),
            journey: None,
            conversation: None,
            pending_invitations: Vec::new(),
            dreams: Vec::new(),
            notices: Vec::new(),
        };
        let json = serde_json::to_string(&perception).unwrap_or_default();
        let back: Result<Perception, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(perception));
    }
}
