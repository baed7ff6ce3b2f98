//! The closed action vocabulary and action results.
//!
//! Exactly 27 actions, grouped by family. Each variant carries the data the
//! action engine needs to validate and execute it. The reasoner selects
//! actions through the tool schema produced by [`tool_schemas`]; the engine
//! never accepts anything outside this union.

use serde::{Deserialize, Serialize};

use crate::agent::ResourceKind;
use crate::geometry::{Direction, Position};
use crate::ids::AgentName;
use crate::social::Privacy;

/// A direction an agent can look or reach: the four compass edges plus its
/// own cell. Object interaction is always directional -- agents never
/// address objects by internal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookDirection {
    /// The cell to the north.
    North,
    /// The cell to the south.
    South,
    /// The cell to the east.
    East,
    /// The cell to the west.
    West,
    /// The agent's own cell.
    Down,
}

impl LookDirection {
    /// The cardinal direction, or `None` for `Down`.
    pub const fn as_direction(self) -> Option<Direction> {
        match self {
            Self::North => Some(Direction::North),
            Self::South => Some(Direction::South),
            Self::East => Some(Direction::East),
            Self::West => Some(Direction::West),
            Self::Down => None,
        }
    }
}

/// Which crafting verb a recipe belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CraftVerb {
    /// Join materials together.
    Combine,
    /// Shape one material with a technique.
    Work,
    /// Use a tool on a material; the tool is kept.
    Apply,
}

/// An action submitted by an agent for validation and execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    // --- Movement ---
    /// Step one cell in a direction. Requires a legal step.
    Walk {
        /// Where to step.
        direction: Direction,
    },
    /// Step once toward an agent or named target currently in vision.
    Approach {
        /// Agent name, named place, or visible object kind.
        target: String,
    },
    /// Plan a multi-tick walk to a destination, then advance one cell per
    /// tick in trance until arrival or interrupt.
    Journey {
        /// The destination cell.
        destination: Position,
    },

    // --- Perception (active) ---
    /// Inspect an adjacent cell (or the agent's own). Structured result,
    /// no state change.
    Examine {
        /// Which cell to inspect.
        direction: LookDirection,
    },
    /// Coarse bearings to every known agent. No state change.
    SenseOthers,

    // --- Interaction ---
    /// Pick up a placed object from an adjacent cell or the agent's own.
    Take {
        /// Which cell to take from.
        direction: LookDirection,
    },
    /// Put one unit of a stack, or a carried item, onto the ground.
    Drop {
        /// Resource or item kind to drop.
        kind: String,
    },
    /// Hand one unit of a stack, or a carried item, to a nearby agent.
    Give {
        /// Resource or item kind to give.
        kind: String,
        /// Who receives it. Must be within one step.
        recipient: AgentName,
    },
    /// Collect one unit of the terrain's gatherable resource.
    Gather,

    // --- Material ---
    /// Join materials per the recipe table.
    Combine {
        /// The stackable inputs to consume.
        inputs: Vec<ResourceKind>,
    },
    /// Shape a material with a named technique per the recipe table.
    Work {
        /// The material to work.
        material: ResourceKind,
        /// The technique applied to it.
        technique: String,
    },
    /// Use a carried tool on a material per the recipe table. The tool
    /// survives.
    Apply {
        /// The tool's item kind.
        tool: String,
        /// The material the tool is applied to.
        target: ResourceKind,
    },

    // --- Building ---
    /// Raise a 3×3 walled enclosure centred on the agent, with one door on
    /// the facing side.
    BuildShelter {
        /// The side carrying the door.
        facing: Direction,
    },
    /// Place a wall on one edge of the agent's cell (mirrored on the
    /// neighbour).
    PlaceWall {
        /// The edge to wall.
        direction: Direction,
    },
    /// Open a door in an existing wall.
    PlaceDoor {
        /// The walled edge to put a door in.
        direction: Direction,
    },
    /// Stand a carried item in the world as an object.
    PlaceItem {
        /// The item kind to place.
        item: String,
    },
    /// Remove a wall from one edge of the agent's cell (mirrored).
    RemoveWall {
        /// The edge to clear.
        direction: Direction,
    },

    // --- Expression ---
    /// Write a sign in the agent's cell.
    WriteSign {
        /// The sign's full text.
        text: String,
    },
    /// Read a sign in an adjacent cell or the agent's own. Returns the full
    /// text.
    ReadSign {
        /// Which cell's sign to read.
        direction: LookDirection,
    },
    /// Give the agent's current cell a name.
    NamePlace {
        /// The name to record.
        name: String,
    },

    // --- Social ---
    /// Speak a turn into the agent's active conversation.
    Speak {
        /// What to say.
        text: String,
    },
    /// Invite a visible agent to talk.
    Invite {
        /// Who to invite.
        invitee: AgentName,
        /// Whether bystanders may later join.
        privacy: Privacy,
    },
    /// Accept the pending invitation most recently addressed to this agent.
    AcceptInvite,
    /// Decline the pending invitation most recently addressed to this agent.
    DeclineInvite,
    /// Join a public conversation by naming a visible participant.
    JoinConversation {
        /// A current participant the joiner can see.
        participant: AgentName,
    },
    /// Leave the active conversation.
    LeaveConversation,

    // --- State ---
    /// Fall asleep until morning or until company arrives.
    Sleep,
}

impl Action {
    /// The action's canonical snake\_case name (matches the tool schema).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Walk { .. } => "walk",
            Self::Approach { .. } => "approach",
            Self::Journey { .. } => "journey",
            Self::Examine { .. } => "examine",
            Self::SenseOthers => "sense_others",
            Self::Take { .. } => "take",
            Self::Drop { .. } => "drop",
            Self::Give { .. } => "give",
            Self::Gather => "gather",
            Self::Combine { .. } => "combine",
            Self::Work { .. } => "work",
            Self::Apply { .. } => "apply",
            Self::BuildShelter { .. } => "build_shelter",
            Self::PlaceWall { .. } => "place_wall",
            Self::PlaceDoor { .. } => "place_door",
            Self::PlaceItem { .. } => "place_item",
            Self::RemoveWall { .. } => "remove_wall",
            Self::WriteSign { .. } => "write_sign",
            Self::ReadSign { .. } => "read_sign",
            Self::NamePlace { .. } => "name_place",
            Self::Speak { .. } => "speak",
            Self::Invite { .. } => "invite",
            Self::AcceptInvite => "accept_invite",
            Self::DeclineInvite => "decline_invite",
            Self::JoinConversation { .. } => "join_conversation",
            Self::LeaveConversation => "leave_conversation",
            Self::Sleep => "sleep",
        }
    }
}

/// The outcome of one executed action.
///
/// A failed result carries an explanatory message, emits no events, and
/// consumes no resources. `data` holds the structured payload perception
/// actions and crafting return (to be narrated externally).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// The canonical name of the action attempted.
    pub action: String,
    /// Whether the action succeeded.
    pub success: bool,
    /// Human-readable summary (also the narrator fallback text).
    pub message: String,
    /// Structured result payload; `null` when there is none.
    pub data: serde_json::Value,
}

impl ActionResult {
    /// A successful result with no structured payload.
    pub fn ok(action: &Action, message: impl Into<String>) -> Self {
        Self {
            action: action.name().to_owned(),
            success: true,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    /// A successful result carrying structured data.
    pub fn ok_with(action: &Action, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            action: action.name().to_owned(),
            success: true,
            message: message.into(),
            data,
        }
    }

    /// A failed result. Failed actions emit no events.
    pub fn fail(action: &Action, message: impl Into<String>) -> Self {
        Self {
            action: action.name().to_owned(),
            success: false,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    /// A failed result carrying structured data (e.g. recipe hints).
    pub fn fail_with(action: &Action, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            action: action.name().to_owned(),
            success: false,
            message: message.into(),
            data,
        }
    }
}

/// Number of actions in the vocabulary.
pub const ACTION_COUNT: usize = 27;

/// The fixed tool schema advertised to the reasoner: one entry per action,
/// each with a JSON-schema parameter object.
pub fn tool_schemas() -> serde_json::Value {
    let dir = || serde_json::json!({ "type": "string", "enum": ["north", "south", "east", "west"] });
    let look = || serde_json::json!({ "type": "string", "enum": ["north", "south", "east", "west", "down"] });
    let resource = || serde_json::json!({ "type": "string", "enum": ResourceKind::ALL.map(ResourceKind::as_str) });

    serde_json::json!([
        { "name": "walk", "description": "Step one cell in a cardinal direction.",
          "parameters": { "type": "object", "properties": { "direction": dir() }, "required": ["direction"] } },
        { "name": "approach", "description": "Step once toward an agent or landmark you can see.",
          "parameters": { "type": "object", "properties": { "target": { "type": "string" } }, "required": ["target"] } },
        { "name": "journey", "description": "Walk over several ticks to a destination cell. You will be in a trance until you arrive or something interrupts you.",
          "parameters": { "type": "object", "properties": { "destination": { "type": "object",
              "properties": { "x": { "type": "integer" }, "y": { "type": "integer" } }, "required": ["x", "y"] } }, "required": ["destination"] } },
        { "name": "examine", "description": "Look closely at an adjacent cell, or your own (down).",
          "parameters": { "type": "object", "properties": { "direction": look() }, "required": ["direction"] } },
        { "name": "sense_others", "description": "Sense rough direction and distance of everyone you know.",
          "parameters": { "type": "object", "properties": {} } },
        { "name": "take", "description": "Pick up an object lying in an adjacent cell or your own (down).",
          "parameters": { "type": "object", "properties": { "direction": look() }, "required": ["direction"] } },
        { "name": "drop", "description": "Put one unit of a resource, or a carried item, on the ground.",
          "parameters": { "type": "object", "properties": { "kind": { "type": "string" } }, "required": ["kind"] } },
        { "name": "give", "description": "Hand a resource or item to an agent within one step of you.",
          "parameters": { "type": "object", "properties": { "kind": { "type": "string" },
              "recipient": { "type": "string" } }, "required": ["kind", "recipient"] } },
        { "name": "gather", "description": "Collect one unit of whatever this terrain yields.",
          "parameters": { "type": "object", "properties": {} } },
        { "name": "combine", "description": "Join materials from your inventory into something new.",
          "parameters": { "type": "object", "properties": { "inputs": { "type": "array", "items": resource() } }, "required": ["inputs"] } },
        { "name": "work", "description": "Shape a single material with a technique (carve, knap, coil, ...).",
          "parameters": { "type": "object", "properties": { "material": resource(),
              "technique": { "type": "string" } }, "required": ["material", "technique"] } },
        { "name": "apply", "description": "Use a tool you carry on a material. The tool is kept.",
          "parameters": { "type": "object", "properties": { "tool": { "type": "string" },
              "target": resource() }, "required": ["tool", "target"] } },
        { "name": "build_shelter", "description": "Raise a 3x3 walled shelter around yourself with a door on the facing side.",
          "parameters": { "type": "object", "properties": { "facing": dir() }, "required": ["facing"] } },
        { "name": "place_wall", "description": "Place a wall on one edge of your cell.",
          "parameters": { "type": "object", "properties": { "direction": dir() }, "required": ["direction"] } },
        { "name": "place_door", "description": "Open a door in an existing wall on your cell.",
          "parameters": { "type": "object", "properties": { "direction": dir() }, "required": ["direction"] } },
        { "name": "place_item", "description": "Stand a carried item in your cell as an object.",
          "parameters": { "type": "object", "properties": { "item": { "type": "string" } }, "required": ["item"] } },
        { "name": "remove_wall", "description": "Remove a wall from one edge of your cell.",
          "parameters": { "type": "object", "properties": { "direction": dir() }, "required": ["direction"] } },
        { "name": "write_sign", "description": "Write a sign here for others to read.",
          "parameters": { "type": "object", "properties": { "text": { "type": "string" } }, "required": ["text"] } },
        { "name": "read_sign", "description": "Read the sign in an adjacent cell or your own (down).",
          "parameters": { "type": "object", "properties": { "direction": look() }, "required": ["direction"] } },
        { "name": "name_place", "description": "Name the place you are standing.",
          "parameters": { "type": "object", "properties": { "name": { "type": "string" } }, "required": ["name"] } },
        { "name": "speak", "description": "Say something in your current conversation.",
          "parameters": { "type": "object", "properties": { "text": { "type": "string" } }, "required": ["text"] } },
        { "name": "invite", "description": "Invite an agent you can see to talk.",
          "parameters": { "type": "object", "properties": { "invitee": { "type": "string" },
              "privacy": { "type": "string", "enum": ["public", "private"] } }, "required": ["invitee", "privacy"] } },
        { "name": "accept_invite", "description": "Accept your most recent pending invitation.",
          "parameters": { "type": "object", "properties": {} } },
        { "name": "decline_invite", "description": "Decline your most recent pending invitation.",
          "parameters": { "type": "object", "properties": {} } },
        { "name": "join_conversation", "description": "Join a public conversation by naming a participant you can see.",
          "parameters": { "type": "object", "properties": { "participant": { "type": "string" } }, "required": ["participant"] } },
        { "name": "leave_conversation", "description": "Leave your current conversation.",
          "parameters": { "type": "object", "properties": {} } },
        { "name": "sleep", "description": "Sleep until morning, or until someone arrives.",
          "parameters": { "type": "object", "properties": {} } },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_schema_covers_the_whole_vocabulary() {
        let schema = tool_schemas();
        let tools = schema.as_array().map(Vec::len);
        assert_eq!(tools, Some(ACTION_COUNT));
    }

    #[test]
    fn action_serde_uses_snake_case_tags() {
        let action = Action::Walk {
            direction: Direction::North,
        };
        let json = serde_json::to_value(&action).ok();
        assert_eq!(
            json,
            serde_json::json!({ "action": "walk", "direction": "north" }).into()
        );
    }

    #[test]
    fn action_names_match_schema_names() {
        let schema = tool_schemas();
        let names: Vec<String> = schema
            .as_array()
            .map(|tools| {
                tools
                    .iter()
                    .filter_map(|t| t.get("name").and_then(serde_json::Value::as_str))
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        assert!(names.contains(&Action::Gather.name().to_owned()));
        assert!(names.contains(&Action::Sleep.name().to_owned()));
        assert!(names.contains(&Action::AcceptInvite.name().to_owned()));
    }

    #[test]
    fn look_direction_down_has_no_cardinal() {
        assert_eq!(LookDirection::Down.as_direction(), None);
        assert_eq!(LookDirection::East.as_direction(), Some(Direction::East));
    }

    #[test]
    fn failed_results_carry_the_action_name() {
        let result = ActionResult::fail(&Action::Gather, "nothing to gather here");
        assert_eq!(result.action, "gather");
        assert!(!result.success);
        assert!(result.data.is_null());
    }
}
