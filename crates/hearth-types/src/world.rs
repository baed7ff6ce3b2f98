//! World records: terrain, cells, world objects, structures, world meta.
//!
//! Cells are sparse: a cell equal to [`Cell::default`] (grass, no walls) is
//! never persisted. Structures are derived data -- they are recomputed from
//! walls and doors by flood fill, never authored directly.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::agent::ResourceKind;
use crate::geometry::{Direction, Position};
use crate::ids::{AgentName, ObjectId, StructureId};

/// Terrain of a single cell. Each variant has fixed properties.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open grassland -- the default terrain for unstored cells.
    #[default]
    Grass,
    /// Open water. Not passable.
    Water,
    /// Shoreline between water and land.
    Coast,
    /// Loose sand.
    Sand,
    /// Exposed rock.
    Stone,
    /// Woodland.
    Forest,
    /// Raised ground.
    Hill,
}

impl Terrain {
    /// Whether agents can stand on or cross this terrain.
    pub const fn passable(self) -> bool {
        !matches!(self, Self::Water)
    }

    /// The resource a `gather` action yields here, if any.
    pub const fn gatherable_resource(self) -> Option<ResourceKind> {
        match self {
            Self::Grass => Some(ResourceKind::GrassFiber),
            Self::Sand => Some(ResourceKind::Clay),
            Self::Forest => Some(ResourceKind::Wood),
            Self::Stone => Some(ResourceKind::Stone),
            Self::Water | Self::Coast | Self::Hill => None,
        }
    }
}

/// One grid cell: terrain plus the walls and doors on its four edges.
///
/// Invariant: `doors` is a subset of `walls` -- a door is an opening in an
/// existing wall. All wall mutations go through the world service's
/// symmetric placement routine; nothing else may touch these sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Cell {
    /// The cell's terrain.
    pub terrain: Terrain,
    /// Edges carrying a wall.
    pub walls: BTreeSet<Direction>,
    /// Walled edges carrying a door.
    pub doors: BTreeSet<Direction>,
}

impl Cell {
    /// A bare cell of the given terrain.
    pub const fn of(terrain: Terrain) -> Self {
        Self {
            terrain,
            walls: BTreeSet::new(),
            doors: BTreeSet::new(),
        }
    }

    /// Whether this cell equals the sparse default and need not be stored.
    pub fn is_default(&self) -> bool {
        self.terrain == Terrain::Grass && self.walls.is_empty() && self.doors.is_empty()
    }

    /// Whether the given edge can be crossed: no wall, or a wall with a door.
    pub fn edge_open(&self, direction: Direction) -> bool {
        !self.walls.contains(&direction) || self.doors.contains(&direction)
    }
}

/// Weather over the whole world.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    /// Clear skies.
    #[default]
    Clear,
    /// Overcast.
    Cloudy,
    /// Rain.
    Rainy,
    /// Fog.
    Foggy,
}

/// Time of day, derived from the tick counter (`tick mod 4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// Ticks ≡ 0 (mod 4). Sleeping agents wake at morning.
    Morning,
    /// Ticks ≡ 1 (mod 4).
    Afternoon,
    /// Ticks ≡ 2 (mod 4).
    Evening,
    /// Ticks ≡ 3 (mod 4). Vision is reduced at night.
    Night,
}

impl TimeOfDay {
    /// Derive the time of day for a tick. Never stored independently --
    /// the tick number is the source of truth.
    pub const fn from_tick(tick: u64) -> Self {
        match tick % 4 {
            0 => Self::Morning,
            1 => Self::Afternoon,
            2 => Self::Evening,
            _ => Self::Night,
        }
    }
}

impl core::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        };
        write!(f, "{s}")
    }
}

/// The singleton world record: tick counter, bounds, weather.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMeta {
    /// Last committed tick number.
    pub tick: u64,
    /// World width in cells.
    pub width: u32,
    /// World height in cells.
    pub height: u32,
    /// Current weather.
    pub weather: Weather,
}

impl WorldMeta {
    /// Time of day derived from the tick counter.
    pub const fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_tick(self.tick)
    }

    /// Whether a position lies inside the world bounds.
    pub const fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }
}

/// The payload of a world object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    /// A sign with readable text.
    Sign {
        /// The full sign text. Never truncated on read.
        text: String,
        /// The agent who wrote it.
        author: AgentName,
    },
    /// An item placed into the world from an inventory.
    PlacedItem {
        /// The item kind (resource name or crafted-item kind).
        item: String,
        /// Free-form item properties.
        properties: BTreeMap<String, serde_json::Value>,
    },
}

/// A polymorphic object standing in the world.
///
/// Objects are created only by `write_sign` / `place_item` / `drop`
/// actions, never spontaneously. Agents interact with them by compass
/// direction -- the id is internal and never shown to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldObject {
    /// Opaque object id.
    pub id: ObjectId,
    /// The cell the object stands in.
    pub position: Position,
    /// Sign or placed item payload.
    pub kind: ObjectKind,
}

impl WorldObject {
    /// Short human-readable label for perception and narration.
    pub fn label(&self) -> String {
        match &self.kind {
            ObjectKind::Sign { author, .. } => format!("sign (by {author})"),
            ObjectKind::PlacedItem { item, .. } => item.clone(),
        }
    }
}

/// A named place on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPlace {
    /// The named cell.
    pub position: Position,
    /// The name given to it.
    pub name: String,
    /// The agent who named it.
    pub named_by: AgentName,
}

/// A derived structure: a region fully enclosed by walls and doors.
///
/// Recomputed by flood fill whenever a wall change touches the region.
/// Never authored directly and never deleted -- a structure whose boundary
/// is opened simply stops being detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Opaque structure id.
    pub id: StructureId,
    /// Every interior cell of the enclosure.
    pub interior: BTreeSet<Position>,
    /// Agents who placed any bounding wall.
    pub creators: BTreeSet<AgentName>,
    /// Whether the structure is considered private to its creators.
    pub is_private: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_is_impassable() {
        assert!(!Terrain::Water.passable());
        assert!(Terrain::Grass.passable());
        assert!(Terrain::Hill.passable());
    }

    #[test]
    fn gatherable_resources_match_terrain() {
        assert_eq!(Terrain::Grass.gatherable_resource(), Some(ResourceKind::GrassFiber));
        assert_eq!(Terrain::Sand.gatherable_resource(), Some(ResourceKind::Clay));
        assert_eq!(Terrain::Forest.gatherable_resource(), Some(ResourceKind::Wood));
        assert_eq!(Terrain::Stone.gatherable_resource(), Some(ResourceKind::Stone));
        assert_eq!(Terrain::Water.gatherable_resource(), None);
        assert_eq!(Terrain::Coast.gatherable_resource(), None);
        assert_eq!(Terrain::Hill.gatherable_resource(), None);
    }

    #[test]
    fn default_cell_is_sparse() {
        assert!(Cell::default().is_default());
        assert!(!Cell::of(Terrain::Forest).is_default());

        let mut walled = Cell::default();
        walled.walls.insert(Direction::North);
        assert!(!walled.is_default());
    }

    #[test]
    fn edge_open_respects_doors() {
        let mut cell = Cell::default();
        assert!(cell.edge_open(Direction::North));
        cell.walls.insert(Direction::North);
        assert!(!cell.edge_open(Direction::North));
        cell.doors.insert(Direction::North);
        assert!(cell.edge_open(Direction::North));
    }

    #[test]
    fn time_of_day_cycles_every_four_ticks() {
        assert_eq!(TimeOfDay::from_tick(0), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_tick(1), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_tick(2), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_tick(3), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_tick(4), TimeOfDay::Morning);
    }

    #[test]
    fn world_meta_bounds() {
        let meta = WorldMeta {
            tick: 0,
            width: 10,
            height: 8,
            weather: Weather::Clear,
        };
        assert!(meta.in_bounds(Position::new(9, 7)));
        assert!(!meta.in_bounds(Position::new(10, 0)));
        assert!(!meta.in_bounds(Position::new(0, 8)));
    }
}
