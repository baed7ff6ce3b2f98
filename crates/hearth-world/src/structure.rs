//! Structure detection: flood fill over wall-bounded regions.
//!
//! Structures are derived, never authored. A structure is the set of cells
//! reachable from a seed across unwalled edges; any wall bounds the fill,
//! doored or not (doors open edges for stepping, never for enclosure), and
//! the region counts only if the fill never leaves the world through an
//! unwalled edge. Any wall change re-runs detection for the touched
//! region.

use std::collections::{BTreeSet, VecDeque};

use hearth_types::{AgentName, Direction, Position, Structure, StructureId};
use tracing::debug;

use crate::grid::WorldGrid;

/// The outcome of a structure refresh after a wall change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureChange {
    /// A newly enclosed region was detected.
    Formed(Structure),
    /// A previously detected structure is no longer enclosed.
    Dissolved(StructureId),
}

/// Flood-fill the enclosure containing `seed`.
///
/// The fill crosses unwalled edges only -- a wall bounds it whether or not
/// the wall carries a door. Returns the interior cell set, or `None` when
/// the fill escapes the world bounds through an unwalled edge (the world
/// edge is not a boundary) or the seed itself is out of bounds.
pub fn detect_enclosure(grid: &WorldGrid, seed: Position) -> Option<BTreeSet<Position>> {
    if !grid.in_bounds(seed) {
        return None;
    }

    let mut interior = BTreeSet::new();
    let mut queue = VecDeque::new();
    interior.insert(seed);
    queue.push_back(seed);

    while let Some(pos) = queue.pop_front() {
        let cell = grid.get_cell(pos);
        for direction in Direction::ALL {
            // A wall bounds the fill whether or not it carries a door:
            // doors open edges for stepping, not for enclosure.
            if cell.walls.contains(&direction) {
                continue;
            }
            let Some(next) = pos.step(direction) else {
                // Open edge off the low side of the grid: not enclosed.
                return None;
            };
            if !grid.in_bounds(next) {
                // Open edge past the far side of the grid: not enclosed.
                return None;
            }
            if interior.insert(next) {
                queue.push_back(next);
            }
        }
    }

    Some(interior)
}

/// Re-run structure detection after a wall change touching `touched` cells.
///
/// Existing structures overlapping the touched cells are re-detected; the
/// ones that no longer hold dissolve. Newly enclosed regions form new
/// structures whose creators are the union of the dissolved overlapping
/// structures' creators and the acting agent (the agent added a bounding
/// wall of every region its change created).
pub fn refresh_structures(
    grid: &mut WorldGrid,
    touched: &[Position],
    actor: Option<&AgentName>,
) -> Vec<StructureChange> {
    let mut changes = Vec::new();

    // Structures whose interior intersects the touched cells.
    let affected: Vec<Structure> = grid
        .structures()
        .values()
        .filter(|s| touched.iter().any(|pos| s.interior.contains(pos)))
        .cloned()
        .collect();

    // Candidate regions seeded from each touched cell.
    let mut regions: Vec<BTreeSet<Position>> = Vec::new();
    for &seed in touched {
        if let Some(region) = detect_enclosure(grid, seed)
            && !regions.contains(&region)
        {
            regions.push(region);
        }
    }

    // Dissolve affected structures whose interior no longer matches a
    // detected region; collect their creators for inheritance.
    let mut inherited: BTreeSet<AgentName> = BTreeSet::new();
    let mut kept: Vec<BTreeSet<Position>> = Vec::new();
    for structure in affected {
        if regions.contains(&structure.interior) {
            kept.push(structure.interior);
            continue;
        }
        inherited.extend(structure.creators.iter().cloned());
        grid.remove_structure(structure.id);
        debug!(structure = %structure.id, "structure dissolved");
        changes.push(StructureChange::Dissolved(structure.id));
    }

    // Form structures for regions not already covered.
    for region in regions {
        if kept.contains(&region) {
            continue;
        }
        let already = grid
            .structures()
            .values()
            .any(|s| s.interior == region);
        if already {
            continue;
        }
        let mut creators = inherited.clone();
        if let Some(actor) = actor {
            creators.insert(actor.clone());
        }
        let structure = Structure {
            id: StructureId::new(),
            interior: region,
            creators,
            is_private: false,
        };
        debug!(structure = %structure.id, cells = structure.interior.len(), "structure formed");
        grid.insert_structure(structure.clone());
        changes.push(StructureChange::Formed(structure));
    }

    changes
}
