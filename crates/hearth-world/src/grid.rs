//! The sparse world grid and its mutation API.
//!
//! Cells equal to the default (grass, no walls) are not stored; queries
//! return the default for them. Wall and door mutations always update both
//! sides of the shared edge in one call -- no caller may touch a cell's
//! wall sets directly.

use std::collections::BTreeMap;

use hearth_types::{
    AgentName, Cell, Direction, NamedPlace, ObjectId, Position, Rect, Structure, StructureId,
    Terrain, WorldObject,
};
use tracing::debug;

use crate::error::WorldError;

/// The world's geography: sparse cells, objects, named places, and the
/// registry of detected structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldGrid {
    width: u32,
    height: u32,
    cells: BTreeMap<Position, Cell>,
    objects: BTreeMap<ObjectId, WorldObject>,
    named_places: BTreeMap<Position, NamedPlace>,
    structures: BTreeMap<StructureId, Structure>,
}

impl WorldGrid {
    /// An empty grass plain of the given dimensions.
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: BTreeMap::new(),
            objects: BTreeMap::new(),
            named_places: BTreeMap::new(),
            structures: BTreeMap::new(),
        }
    }

    /// Rebuild a grid from persisted parts.
    pub const fn from_parts(
        width: u32,
        height: u32,
        cells: BTreeMap<Position, Cell>,
        objects: BTreeMap<ObjectId, WorldObject>,
        named_places: BTreeMap<Position, NamedPlace>,
        structures: BTreeMap<StructureId, Structure>,
    ) -> Self {
        Self {
            width,
            height,
            cells,
            objects,
            named_places,
            structures,
        }
    }

    /// World width in cells.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// World height in cells.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether a position lies inside the world.
    pub const fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// The cell at `pos`, or the default cell if unstored.
    pub fn get_cell(&self, pos: Position) -> Cell {
        self.cells.get(&pos).cloned().unwrap_or_default()
    }

    /// Every stored (non-default) cell.
    pub const fn stored_cells(&self) -> &BTreeMap<Position, Cell> {
        &self.cells
    }

    /// All cells inside `rect` (intersected with the world bounds),
    /// including defaults, in row-major order.
    pub fn cells_in_rect(&self, rect: Rect) -> Vec<(Position, Cell)> {
        rect.positions()
            .filter(|pos| self.in_bounds(*pos))
            .map(|pos| (pos, self.get_cell(pos)))
            .collect()
    }

    /// Overwrite a cell's terrain. Used by world generation and recovery.
    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) -> Result<(), WorldError> {
        self.check_bounds(pos)?;
        self.update_cell(pos, |cell| cell.terrain = terrain);
        Ok(())
    }

    /// Whether an agent could stand at `pos`: inside bounds and on
    /// passable terrain. Agents do not block cells.
    pub fn passable(&self, pos: Position) -> bool {
        self.in_bounds(pos) && self.get_cell(pos).terrain.passable()
    }

    /// Whether one cardinal step from `from` is legal: the destination is
    /// passable and the shared edge carries no wall (or carries a door).
    pub fn can_step(&self, from: Position, direction: Direction) -> bool {
        let Some(to) = from.step(direction) else {
            return false;
        };
        if !self.passable(to) {
            return false;
        }
        self.get_cell(from).edge_open(direction)
    }

    // -----------------------------------------------------------------
    // Walls and doors -- the single symmetric mutation routine
    // -----------------------------------------------------------------

    /// Place a wall on the `direction` edge of `pos` and its mirror on the
    /// neighbouring cell. Returns `false` if the wall already existed
    /// (placement is additive and idempotent).
    pub fn place_wall(&mut self, pos: Position, direction: Direction) -> Result<bool, WorldError> {
        self.check_bounds(pos)?;
        if self.get_cell(pos).walls.contains(&direction) {
            return Ok(false);
        }
        self.update_cell(pos, |cell| {
            cell.walls.insert(direction);
        });
        if let Some(neighbour) = self.neighbour_in_bounds(pos, direction) {
            self.update_cell(neighbour, |cell| {
                cell.walls.insert(direction.opposite());
            });
        }
        debug!(%pos, %direction, "wall placed");
        Ok(true)
    }

    /// Remove the wall (and any door in it) from the `direction` edge of
    /// `pos` and its mirror. Returns `false` if there was no wall.
    pub fn remove_wall(&mut self, pos: Position, direction: Direction) -> Result<bool, WorldError> {
        self.check_bounds(pos)?;
        if !self.get_cell(pos).walls.contains(&direction) {
            return Ok(false);
        }
        self.update_cell(pos, |cell| {
            cell.walls.remove(&direction);
            cell.doors.remove(&direction);
        });
        if let Some(neighbour) = self.neighbour_in_bounds(pos, direction) {
            self.update_cell(neighbour, |cell| {
                cell.walls.remove(&direction.opposite());
                cell.doors.remove(&direction.opposite());
            });
        }
        debug!(%pos, %direction, "wall removed");
        Ok(true)
    }

    /// Open a door in the existing wall on the `direction` edge of `pos`
    /// and its mirror. Returns `false` if the door already existed.
    pub fn place_door(&mut self, pos: Position, direction: Direction) -> Result<bool, WorldError> {
        self.check_bounds(pos)?;
        let cell = self.get_cell(pos);
        if !cell.walls.contains(&direction) {
            return Err(WorldError::NoWallForDoor {
                position: pos,
                direction,
            });
        }
        if cell.doors.contains(&direction) {
            return Ok(false);
        }
        self.update_cell(pos, |cell| {
            cell.doors.insert(direction);
        });
        if let Some(neighbour) = self.neighbour_in_bounds(pos, direction) {
            self.update_cell(neighbour, |cell| {
                cell.doors.insert(direction.opposite());
            });
        }
        debug!(%pos, %direction, "door placed");
        Ok(true)
    }

    /// Check the symmetric-wall invariant over the whole grid. Returns the
    /// first violation found, if any. Used by the tick invariant sweep.
    pub fn check_wall_symmetry(&self) -> Result<(), WorldError> {
        for (pos, cell) in &self.cells {
            for direction in Direction::ALL {
                if !cell.walls.contains(&direction) {
                    continue;
                }
                let Some(neighbour) = self.neighbour_in_bounds(*pos, direction) else {
                    continue;
                };
                if !self.get_cell(neighbour).walls.contains(&direction.opposite()) {
                    return Err(WorldError::WallMismatch {
                        position: *pos,
                        direction,
                    });
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------

    /// All objects standing at `pos`, in id order.
    pub fn objects_at(&self, pos: Position) -> Vec<&WorldObject> {
        self.objects.values().filter(|o| o.position == pos).collect()
    }

    /// Every object in the world.
    pub const fn objects(&self) -> &BTreeMap<ObjectId, WorldObject> {
        &self.objects
    }

    /// Add an object to the world.
    pub fn insert_object(&mut self, object: WorldObject) {
        self.objects.insert(object.id, object);
    }

    /// Remove an object from the world, returning it if it existed.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<WorldObject> {
        self.objects.remove(&id)
    }

    // -----------------------------------------------------------------
    // Named places
    // -----------------------------------------------------------------

    /// Name (or rename) the place at `pos`.
    pub fn rename_place(
        &mut self,
        pos: Position,
        name: impl Into<String>,
        named_by: AgentName,
    ) -> Result<(), WorldError> {
        self.check_bounds(pos)?;
        self.named_places.insert(
            pos,
            NamedPlace {
                position: pos,
                name: name.into(),
                named_by,
            },
        );
        Ok(())
    }

    /// The name of the place at `pos`, if one was given.
    pub fn place_name(&self, pos: Position) -> Option<&NamedPlace> {
        self.named_places.get(&pos)
    }

    /// Every named place.
    pub const fn named_places(&self) -> &BTreeMap<Position, NamedPlace> {
        &self.named_places
    }

    /// Find a named place by its name (first match in position order).
    pub fn find_place(&self, name: &str) -> Option<&NamedPlace> {
        self.named_places.values().find(|p| p.name == name)
    }

    // -----------------------------------------------------------------
    // Structures (registry; detection lives in `structure`)
    // -----------------------------------------------------------------

    /// Every detected structure.
    pub const fn structures(&self) -> &BTreeMap<StructureId, Structure> {
        &self.structures
    }

    /// Record a detected structure.
    pub fn insert_structure(&mut self, structure: Structure) {
        self.structures.insert(structure.id, structure);
    }

    /// Drop a structure that is no longer enclosed.
    pub fn remove_structure(&mut self, id: StructureId) -> Option<Structure> {
        self.structures.remove(&id)
    }

    /// Structures whose interior contains `pos`.
    pub fn structures_at(&self, pos: Position) -> Vec<&Structure> {
        self.structures
            .values()
            .filter(|s| s.interior.contains(&pos))
            .collect()
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    const fn check_bounds(&self, pos: Position) -> Result<(), WorldError> {
        if self.in_bounds(pos) {
            Ok(())
        } else {
            Err(WorldError::OutOfBounds {
                position: pos,
                width: self.width,
                height: self.height,
            })
        }
    }

    fn neighbour_in_bounds(&self, pos: Position, direction: Direction) -> Option<Position> {
        pos.step(direction).filter(|p| self.in_bounds(*p))
    }

    /// Mutate a cell, keeping storage sparse: a cell left equal to the
    /// default is removed from the map.
    fn update_cell(&mut self, pos: Position, mutate: impl FnOnce(&mut Cell)) {
        let mut cell = self.get_cell(pos);
        mutate(&mut cell);
        if cell.is_default() {
            self.cells.remove(&pos);
        } else {
            self.cells.insert(pos, cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use hearth_types::ObjectKind;

    use super::*;

    fn grid() -> WorldGrid {
        WorldGrid::new(20, 20)
    }

    #[test]
    fn unstored_cells_are_default() {
        let g = grid();
        assert_eq!(g.get_cell(Position::new(3, 3)), Cell::default());
        assert!(g.stored_cells().is_empty());
    }

    #[test]
    fn wall_placement_is_symmetric() {
        let mut g = grid();
        let p = Position::new(5, 5);
        assert_eq!(g.place_wall(p, Direction::North).ok(), Some(true));

        // North edge of (5,5) mirrors the south edge of (5,4).
        assert!(g.get_cell(p).walls.contains(&Direction::North));
        assert!(g.get_cell(Position::new(5, 4)).walls.contains(&Direction::South));
        assert!(g.check_wall_symmetry().is_ok());
    }

    #[test]
    fn wall_placement_is_idempotent() {
        let mut g = grid();
        let p = Position::new(5, 5);
        assert_eq!(g.place_wall(p, Direction::East).ok(), Some(true));
        assert_eq!(g.place_wall(p, Direction::East).ok(), Some(false));
        // Placing the mirror side reports already-present too.
        assert_eq!(g.place_wall(Position::new(6, 5), Direction::West).ok(), Some(false));
    }

    #[test]
    fn remove_wall_restores_the_pre_state_exactly() {
        let mut g = grid();
        let p = Position::new(5, 5);
        let before = g.clone();
        let _ = g.place_wall(p, Direction::North);
        let _ = g.remove_wall(p, Direction::North);
        assert_eq!(g, before);
    }

    #[test]
    fn door_requires_a_wall() {
        let mut g = grid();
        let p = Position::new(4, 4);
        assert!(g.place_door(p, Direction::West).is_err());

        let _ = g.place_wall(p, Direction::West);
        assert_eq!(g.place_door(p, Direction::West).ok(), Some(true));
        assert!(g.get_cell(Position::new(3, 4)).doors.contains(&Direction::East));
    }

    #[test]
    fn can_step_blocked_by_wall_unless_doored() {
        let mut g = grid();
        let p = Position::new(5, 5);
        assert!(g.can_step(p, Direction::North));

        let _ = g.place_wall(p, Direction::North);
        assert!(!g.can_step(p, Direction::North));
        // Mirror side is equally blocked.
        assert!(!g.can_step(Position::new(5, 4), Direction::South));

        let _ = g.place_door(p, Direction::North);
        assert!(g.can_step(p, Direction::North));
    }

    #[test]
    fn can_step_refuses_water_and_world_edge() {
        let mut g = grid();
        let _ = g.set_terrain(Position::new(5, 4), hearth_types::Terrain::Water);
        assert!(!g.can_step(Position::new(5, 5), Direction::North));
        assert!(!g.can_step(Position::new(0, 0), Direction::West));
    }

    #[test]
    fn walls_on_the_world_edge_have_no_mirror() {
        let mut g = grid();
        assert_eq!(g.place_wall(Position::new(0, 0), Direction::North).ok(), Some(true));
        assert!(g.check_wall_symmetry().is_ok());
    }

    #[test]
    fn cells_in_rect_clips_to_bounds() {
        let g = grid();
        let rect = Rect {
            min: Position::new(18, 18),
            max: Position::new(25, 25),
        };
        let cells = g.cells_in_rect(rect);
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn objects_found_by_position() {
        let mut g = grid();
        let object = WorldObject {
            id: ObjectId::new(),
            position: Position::new(2, 2),
            kind: ObjectKind::PlacedItem {
                item: String::from("clay_pot"),
                properties: BTreeMap::new(),
            },
        };
        let id = object.id;
        g.insert_object(object);
        assert_eq!(g.objects_at(Position::new(2, 2)).len(), 1);
        assert!(g.objects_at(Position::new(2, 3)).is_empty());

        assert!(g.remove_object(id).is_some());
        assert!(g.objects_at(Position::new(2, 2)).is_empty());
    }

    #[test]
    fn named_places_can_be_renamed() {
        let mut g = grid();
        let p = Position::new(7, 7);
        let rowan = AgentName::from("Rowan");
        let _ = g.rename_place(p, "The Hollow", rowan.clone());
        let _ = g.rename_place(p, "Rowan's Rest", rowan);
        assert_eq!(g.place_name(p).map(|n| n.name.as_str()), Some("Rowan's Rest"));
        assert!(g.find_place("The Hollow").is_none());
    }
}
