//! Building handlers: `build_shelter`, `place_wall`, `place_door`,
//! `place_item`, `remove_wall`.
//!
//! Wall work always goes through the world grid's symmetric placement
//! routine. Any wall change re-runs structure detection over the touched
//! cells, so derived structures stay honest.

use hearth_types::{
    Action, AgentName, Direction, EventKind, ObjectId, ObjectKind, Position, WorldObject,
};
use hearth_world::refresh_structures;

use crate::inventory;

use super::{ActionContext, ActionOutcome, structure_events};

/// `place_wall`: wall one edge of the actor's cell.
pub fn place_wall(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    direction: Direction,
) -> ActionOutcome {
    let Some(position) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };

    match ctx.state.grid.place_wall(position, direction) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok(false) => ActionOutcome::fail(action, "There is already a wall there."),
        Ok(true) => {
            let mut events = vec![EventKind::WallPlaced {
                agent: actor.clone(),
                position,
                direction,
            }];
            events.extend(refresh_after_wall_change(ctx, position, direction, actor));
            ActionOutcome {
                result: hearth_types::ActionResult::ok(
                    action,
                    format!("You raise a wall on the {direction} side."),
                ),
                events,
            }
        }
    }
}

/// `remove_wall`: clear one edge of the actor's cell.
pub fn remove_wall(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    direction: Direction,
) -> ActionOutcome {
    let Some(position) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };

    match ctx.state.grid.remove_wall(position, direction) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok(false) => ActionOutcome::fail(action, "There is no wall there."),
        Ok(true) => {
            let mut events = vec![EventKind::WallRemoved {
                agent: actor.clone(),
                position,
                direction,
            }];
            events.extend(refresh_after_wall_change(ctx, position, direction, actor));
            ActionOutcome {
                result: hearth_types::ActionResult::ok(
                    action,
                    format!("You take down the wall on the {direction} side."),
                ),
                events,
            }
        }
    }
}

/// `place_door`: open a door in an existing wall.
pub fn place_door(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    direction: Direction,
) -> ActionOutcome {
    let Some(position) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };

    match ctx.state.grid.place_door(position, direction) {
        Err(err) => ActionOutcome::fail(action, err.to_string()),
        Ok(false) => ActionOutcome::fail(action, "There is already a door there."),
        Ok(true) => ActionOutcome::ok(
            action,
            format!("You set a door into the {direction} wall."),
            vec![EventKind::DoorPlaced {
                agent: actor.clone(),
                position,
                direction,
            }],
        ),
    }
}

/// `build_shelter`: a 3x3 enclosure centred on the actor with one door on
/// the facing side. Additive over existing walls -- only newly placed
/// edges emit events; overlap is never an error.
pub fn build_shelter(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    facing: Direction,
) -> ActionOutcome {
    let Some(center) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };

    // The full 3x3 footprint must sit inside the world.
    let fits = center.x >= 1
        && center.y >= 1
        && center.x.saturating_add(1) < ctx.state.grid.width()
        && center.y.saturating_add(1) < ctx.state.grid.height();
    if !fits {
        return ActionOutcome::fail(action, "Too close to the edge of the world to build here.");
    }

    let mut events = Vec::new();
    let min = Position::new(center.x.saturating_sub(1), center.y.saturating_sub(1));
    let max = Position::new(center.x.saturating_add(1), center.y.saturating_add(1));

    // Perimeter walls: each outer edge of the ring.
    let mut edges: Vec<(Position, Direction)> = Vec::new();
    for x in min.x..=max.x {
        edges.push((Position::new(x, min.y), Direction::North));
        edges.push((Position::new(x, max.y), Direction::South));
    }
    for y in min.y..=max.y {
        edges.push((Position::new(min.x, y), Direction::West));
        edges.push((Position::new(max.x, y), Direction::East));
    }
    for (pos, direction) in edges {
        match ctx.state.grid.place_wall(pos, direction) {
            Err(err) => return ActionOutcome::fail(action, err.to_string()),
            Ok(true) => events.push(EventKind::WallPlaced {
                agent: actor.clone(),
                position: pos,
                direction,
            }),
            Ok(false) => {}
        }
    }

    // One door on the middle cell of the facing side.
    let Some(door_cell) = center.step(facing) else {
        return ActionOutcome::fail(action, "Too close to the edge of the world to build here.");
    };
    match ctx.state.grid.place_door(door_cell, facing) {
        Err(err) => return ActionOutcome::fail(action, err.to_string()),
        Ok(true) => events.push(EventKind::DoorPlaced {
            agent: actor.clone(),
            position: door_cell,
            direction: facing,
        }),
        Ok(false) => {}
    }

    events.push(EventKind::ShelterBuilt {
        agent: actor.clone(),
        center,
        facing,
    });

    // Re-detect structures over the whole footprint.
    let interior: Vec<Position> = (min.y..=max.y)
        .flat_map(|y| (min.x..=max.x).map(move |x| Position::new(x, y)))
        .collect();
    let changes = refresh_structures(&mut ctx.state.grid, &interior, Some(actor));
    events.extend(structure_events(changes));

    ActionOutcome {
        result: hearth_types::ActionResult::ok(
            action,
            format!("You raise a shelter around {center} with its door to the {facing}."),
        ),
        events,
    }
}

/// `place_item`: stand a carried item in the actor's cell.
pub fn place_item(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    item_kind: &str,
) -> ActionOutcome {
    let Some(position) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };

    let item = {
        let Some(agent) = ctx.state.roster.get_mut(actor) else {
            return ActionOutcome::fail(action, "unknown agent");
        };
        match inventory::remove_item_by_kind(&mut agent.inventory, item_kind) {
            Ok(item) => item,
            Err(err) => return ActionOutcome::fail(action, err.to_string()),
        }
    };

    let object = WorldObject {
        id: ObjectId::new(),
        position,
        kind: ObjectKind::PlacedItem {
            item: item.kind.clone(),
            properties: item.properties,
        },
    };
    let object_id = object.id;
    ctx.state.grid.insert_object(object);

    ActionOutcome::ok(
        action,
        format!("You set the {item_kind} in place."),
        vec![EventKind::ItemPlaced {
            agent: actor.clone(),
            object: object_id,
            position,
            item: item.kind,
        }],
    )
}

/// Re-run detection around a changed edge: the cell and its neighbour.
fn refresh_after_wall_change(
    ctx: &mut ActionContext<'_>,
    position: Position,
    direction: Direction,
    actor: &AgentName,
) -> Vec<EventKind> {
    let mut touched = vec![position];
    if let Some(neighbour) = position.step(direction)
        && ctx.state.grid.in_bounds(neighbour)
    {
        touched.push(neighbour);
    }
    structure_events(refresh_structures(&mut ctx.state.grid, &touched, Some(actor)))
}

#[cfg(test)]
mod tests {
    use super::super::execute_action;
    use super::super::testkit::{ctx, state_with};
    use super::*;

    #[test]
    fn shelter_walls_are_symmetric_and_structure_forms() {
        let mut state = state_with(&[("Ash", 10, 10)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(&mut ctx, &ash, &Action::BuildShelter { facing: Direction::South });
        assert!(outcome.result.success);

        // Door sits on the southern edge of (10, 11).
        let door_cell = ctx.state.grid.get_cell(Position::new(10, 11));
        assert!(door_cell.doors.contains(&Direction::South));
        assert!(ctx.state.grid.check_wall_symmetry().is_ok());

        // Exactly one structure: nine interior cells, Ash the sole creator.
        let structures: Vec<_> = ctx.state.grid.structures().values().collect();
        assert_eq!(structures.len(), 1);
        assert_eq!(structures.first().map(|s| s.interior.len()), Some(9));
        assert_eq!(
            structures.first().map(|s| s.creators.len()),
            Some(1)
        );
        assert!(structures.first().is_some_and(|s| s.creators.contains(&ash)));

        // 12 walls + 1 door + shelter summary + structure formed.
        let walls = outcome
            .events
            .iter()
            .filter(|e| matches!(e, EventKind::WallPlaced { .. }))
            .count();
        assert_eq!(walls, 12);
        assert!(outcome.events.iter().any(|e| matches!(e, EventKind::StructureFormed { .. })));
    }

    #[test]
    fn shelter_overlap_is_additive_union() {
        let mut state = state_with(&[("Ash", 10, 10)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        // A pre-existing wall on part of the perimeter.
        let _ = ctx.state.grid.place_wall(Position::new(9, 9), Direction::North);

        let outcome = execute_action(&mut ctx, &ash, &Action::BuildShelter { facing: Direction::South });
        assert!(outcome.result.success);
        let walls = outcome
            .events
            .iter()
            .filter(|e| matches!(e, EventKind::WallPlaced { .. }))
            .count();
        // One of the 12 edges already existed and emits no event.
        assert_eq!(walls, 11);
    }

    #[test]
    fn shelter_at_the_world_edge_fails() {
        let mut state = state_with(&[("Ash", 0, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(&mut ctx, &ash, &Action::BuildShelter { facing: Direction::South });
        assert!(!outcome.result.success);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn wall_then_remove_restores_prior_state() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");
        let before = ctx.state.grid.clone();

        let placed = execute_action(&mut ctx, &ash, &Action::PlaceWall { direction: Direction::East });
        assert!(placed.result.success);
        let removed = execute_action(&mut ctx, &ash, &Action::RemoveWall { direction: Direction::East });
        assert!(removed.result.success);

        assert_eq!(*ctx.state.grid.stored_cells(), *before.stored_cells());
    }

    #[test]
    fn double_wall_placement_fails_without_events() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let _ = execute_action(&mut ctx, &ash, &Action::PlaceWall { direction: Direction::East });
        let second = execute_action(&mut ctx, &ash, &Action::PlaceWall { direction: Direction::East });
        assert!(!second.result.success);
        assert!(second.events.is_empty());
    }

    #[test]
    fn door_needs_a_wall_first() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(&mut ctx, &ash, &Action::PlaceDoor { direction: Direction::North });
        assert!(!outcome.result.success);

        let _ = execute_action(&mut ctx, &ash, &Action::PlaceWall { direction: Direction::North });
        let outcome = execute_action(&mut ctx, &ash, &Action::PlaceDoor { direction: Direction::North });
        assert!(outcome.result.success);
    }
}
