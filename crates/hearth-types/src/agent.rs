//! Agent records: resources, items, inventories, journeys.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::ids::{AgentName, ItemId};

/// A stackable resource kind.
///
/// The closed set of kinds an inventory stack can hold: the four terrain
/// gatherables plus the stackable crafting outputs declared by the recipe
/// table. Unique crafted objects are [`Item`]s, not stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Fiber pulled from grassland.
    GrassFiber,
    /// Clay dug from sand.
    Clay,
    /// Wood from forest.
    Wood,
    /// Stone from exposed rock.
    Stone,
    /// Sawn planks (crafted).
    Planks,
    /// Twisted fiber cord (crafted).
    Cord,
    /// Clay tempered with fiber (crafted).
    TemperedClay,
}

impl ResourceKind {
    /// All resource kinds in a fixed deterministic order.
    pub const ALL: [Self; 7] = [
        Self::GrassFiber,
        Self::Clay,
        Self::Wood,
        Self::Stone,
        Self::Planks,
        Self::Cord,
        Self::TemperedClay,
    ];

    /// The canonical snake\_case name (matches the serde representation).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GrassFiber => "grass_fiber",
            Self::Clay => "clay",
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Planks => "planks",
            Self::Cord => "cord",
            Self::TemperedClay => "tempered_clay",
        }
    }

    /// Parse a canonical name back into a kind.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unique crafted object held in an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque unique id. An item id appears in at most one inventory.
    pub id: ItemId,
    /// The item kind (e.g. `stone_axe`).
    pub kind: String,
    /// Free-form properties attached by the recipe that produced it.
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// An agent's carried goods: counted stacks plus unique items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Inventory {
    /// Stackable resources by kind. Counts are always non-negative; a kind
    /// with count zero is removed from the map.
    pub stacks: BTreeMap<ResourceKind, u32>,
    /// Unique crafted items, in acquisition order.
    pub items: Vec<Item>,
}

impl Inventory {
    /// Units held of a stackable kind.
    pub fn count(&self, kind: ResourceKind) -> u32 {
        self.stacks.get(&kind).copied().unwrap_or(0)
    }

    /// Whether any stack or item is carried.
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty() && self.items.is_empty()
    }

    /// First carried item of the given kind, if any.
    pub fn find_item(&self, kind: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.kind == kind)
    }
}

/// A planned multi-tick walk. The agent is in trance while this is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey {
    /// Where the journey ends.
    pub destination: Position,
    /// The full path. `path[0]` is the position the journey started from;
    /// successive entries differ by one cardinal step.
    pub path: Vec<Position>,
    /// Index into `path` of the agent's current position.
    pub progress: usize,
}

impl Journey {
    /// The next path position, or `None` at the end of the path.
    pub fn next_step(&self) -> Option<Position> {
        self.progress.checked_add(1).and_then(|i| self.path.get(i).copied())
    }

    /// Steps remaining until arrival.
    pub fn remaining(&self) -> usize {
        self.path.len().saturating_sub(1).saturating_sub(self.progress)
    }
}

/// A roster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique name -- the agent's primary key.
    pub name: AgentName,
    /// Opaque reasoner model identifier.
    pub model_id: String,
    /// Opaque personality text handed to the reasoner.
    pub personality: String,
    /// Current cell.
    pub position: Position,
    /// Carried goods.
    pub inventory: Inventory,
    /// Active journey, if the agent is in trance.
    pub journey: Option<Journey>,
    /// Whether the agent is asleep.
    pub sleeping: bool,
    /// Persisted reasoner session identity, if a session has begun.
    pub session_id: Option<String>,
    /// The last tick on which this agent took a turn.
    pub last_turn_tick: u64,
    /// Every agent this one has ever been co-visible with. Grows
    /// monotonically; the relation is symmetric and permanent.
    pub known_agents: BTreeSet<AgentName>,
}

impl Agent {
    /// A fresh agent standing at `position` with empty state.
    pub fn new(name: AgentName, model_id: impl Into<String>, personality: impl Into<String>, position: Position) -> Self {
        Self {
            name,
            model_id: model_id.into(),
            personality: personality.into(),
            position,
            inventory: Inventory::default(),
            journey: None,
            sleeping: false,
            session_id: None,
            last_turn_tick: 0,
            known_agents: BTreeSet::new(),
        }
    }

    /// Whether the agent is in journey trance.
    pub const fn in_trance(&self) -> bool {
        self.journey.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_names_roundtrip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::parse("mithril"), None);
    }

    #[test]
    fn inventory_count_defaults_to_zero() {
        let inv = Inventory::default();
        assert_eq!(inv.count(ResourceKind::Wood), 0);
        assert!(inv.is_empty());
    }

    #[test]
    fn journey_progress_tracking() {
        let journey = Journey {
            destination: Position::new(5, 3),
            path: vec![
                Position::new(5, 5),
                Position::new(5, 4),
                Position::new(5, 3),
            ],
            progress: 0,
        };
        assert_eq!(journey.next_step(), Some(Position::new(5, 4)));
        assert_eq!(journey.remaining(), 2);

        let arrived = Journey {
            progress: 2,
            ..journey
        };
        assert_eq!(arrived.next_step(), None);
        assert_eq!(arrived.remaining(), 0);
    }

    #[test]
    fn fresh_agent_is_awake_and_untravelled() {
        let agent = Agent::new(AgentName::from("Rowan"), "model-a", "curious", Position::new(1, 1));
        assert!(!agent.sleeping);
        assert!(!agent.in_trance());
        assert!(agent.known_agents.is_empty());
    }
}
