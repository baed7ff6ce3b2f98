//! Interaction handlers: `examine`, `sense_others`, `take`, `drop`,
//! `give`, `gather`.

use std::collections::BTreeMap;

use hearth_types::{
    Action, AgentName, EventKind, Item, ItemId, LookDirection, ObjectId, ObjectKind, Position,
    ResourceKind, WorldObject,
};

use crate::inventory;
use crate::sensing;

use super::{ActionContext, ActionOutcome};

/// Resolve a look direction from the actor's cell. `Down` is the cell
/// itself; other directions must stay in bounds.
fn resolve_cell(
    ctx: &ActionContext<'_>,
    from: Position,
    direction: LookDirection,
) -> Option<Position> {
    match direction.as_direction() {
        None => Some(from),
        Some(dir) => from.step(dir).filter(|p| ctx.state.grid.in_bounds(*p)),
    }
}

/// `examine`: structured report on one cell. No state change.
pub fn examine(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    direction: LookDirection,
) -> ActionOutcome {
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    let Some(pos) = resolve_cell(ctx, from, direction) else {
        return ActionOutcome::fail(action, "Only the edge of the world lies that way.");
    };

    let cell = ctx.state.grid.get_cell(pos);
    let objects: Vec<String> = ctx
        .state
        .grid
        .objects_at(pos)
        .iter()
        .map(|o| o.label())
        .collect();
    let agents: Vec<String> = ctx
        .state
        .roster
        .agents_at(pos)
        .iter()
        .filter(|a| &a.name != actor)
        .map(|a| a.name.to_string())
        .collect();
    let place_name = ctx.state.grid.place_name(pos).map(|p| p.name.clone());

    let data = serde_json::json!({
        "position": pos,
        "terrain": cell.terrain,
        "walls": cell.walls,
        "doors": cell.doors,
        "objects": objects,
        "agents": agents,
        "place_name": place_name,
    });
    ActionOutcome {
        result: hearth_types::ActionResult::ok_with(action, format!("You look over {pos}."), data),
        events: Vec::new(),
    }
}

/// `sense_others`: coarse bearings to every known agent. No state change.
pub fn sense_others(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
) -> ActionOutcome {
    let readings = sensing::sense_others(&ctx.state.roster, actor);
    let count = readings.len();
    let data = serde_json::json!({ "readings": readings });
    ActionOutcome {
        result: hearth_types::ActionResult::ok_with(
            action,
            format!("You sense {count} familiar presences."),
            data,
        ),
        events: Vec::new(),
    }
}

/// `take`: pick up a placed item from an adjacent cell or the actor's own.
/// Signs are fixed; the second taker of a contested object fails cleanly.
pub fn take(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    direction: LookDirection,
) -> ActionOutcome {
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    let Some(pos) = resolve_cell(ctx, from, direction) else {
        return ActionOutcome::fail(action, "Only the edge of the world lies that way.");
    };

    let takeable: Option<(ObjectId, String, BTreeMap<String, serde_json::Value>)> = ctx
        .state
        .grid
        .objects_at(pos)
        .iter()
        .find_map(|object| match &object.kind {
            ObjectKind::PlacedItem { item, properties } => {
                Some((object.id, item.clone(), properties.clone()))
            }
            ObjectKind::Sign { .. } => None,
        });

    let Some((object_id, kind, properties)) = takeable else {
        let has_sign = ctx
            .state
            .grid
            .objects_at(pos)
            .iter()
            .any(|o| matches!(o.kind, ObjectKind::Sign { .. }));
        let message = if has_sign {
            "The sign is fixed in place."
        } else {
            "There is nothing to take there."
        };
        return ActionOutcome::fail(action, message);
    };

    let Some(object) = ctx.state.grid.remove_object(object_id) else {
        return ActionOutcome::fail(action, "It is already gone.");
    };
    debug_assert_eq!(object.id, object_id);

    if let Some(agent) = ctx.state.roster.get_mut(actor) {
        match ResourceKind::parse(&kind) {
            Some(resource) => {
                if let Err(err) = inventory::add_stack(&mut agent.inventory, resource, 1) {
                    // Put the object back; the take did not happen.
                    ctx.state.grid.insert_object(object);
                    return ActionOutcome::fail(action, err.to_string());
                }
            }
            // The item id is derived from the object id so storage can
            // reproduce it from the event alone.
            None => inventory::add_item(
                &mut agent.inventory,
                Item {
                    id: ItemId::from(object_id.into_inner()),
                    kind: kind.clone(),
                    properties,
                },
            ),
        }
    }

    ActionOutcome::ok(
        action,
        format!("You pick up the {kind}."),
        vec![EventKind::ItemTaken {
            agent: actor.clone(),
            object: object_id,
            position: pos,
            item: kind,
        }],
    )
}

/// `drop`: one unit of a stack, or a carried item, becomes a world object
/// in the actor's cell.
pub fn drop_kind(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    kind: &str,
) -> ActionOutcome {
    let Some(position) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };

    let properties = match take_from_inventory(ctx, actor, kind) {
        Ok(properties) => properties,
        Err(message) => return ActionOutcome::fail(action, message),
    };

    let object = WorldObject {
        id: ObjectId::new(),
        position,
        kind: ObjectKind::PlacedItem {
            item: kind.to_owned(),
            properties,
        },
    };
    let object_id = object.id;
    ctx.state.grid.insert_object(object);

    ActionOutcome::ok(
        action,
        format!("You set the {kind} down."),
        vec![EventKind::ItemDropped {
            agent: actor.clone(),
            object: object_id,
            position,
            item: kind.to_owned(),
        }],
    )
}

/// `give`: hand one unit of a stack, or a carried item, to an agent in the
/// same cell or one step away.
pub fn give(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    kind: &str,
    recipient: &AgentName,
) -> ActionOutcome {
    if actor == recipient {
        return ActionOutcome::fail(action, "You already have it.");
    }
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    let Some(to) = ctx.state.roster.get(recipient).map(|a| a.position) else {
        return ActionOutcome::fail(action, format!("There is nobody called {recipient}."));
    };
    if from.manhattan(to) > 1 {
        return ActionOutcome::fail(action, format!("{recipient} is not within reach."));
    }

    match ResourceKind::parse(kind) {
        Some(resource) => {
            // Stack transfer: remove first, add to the recipient after.
            {
                let Some(giver) = ctx.state.roster.get_mut(actor) else {
                    return ActionOutcome::fail(action, "unknown agent");
                };
                if let Err(err) = inventory::remove_stack(&mut giver.inventory, resource, 1) {
                    return ActionOutcome::fail(action, err.to_string());
                }
            }
            if let Some(receiver) = ctx.state.roster.get_mut(recipient)
                && let Err(err) = inventory::add_stack(&mut receiver.inventory, resource, 1)
            {
                // Undo the removal; nothing happened.
                if let Some(giver) = ctx.state.roster.get_mut(actor) {
                    let _ = inventory::add_stack(&mut giver.inventory, resource, 1);
                }
                return ActionOutcome::fail(action, err.to_string());
            }
        }
        None => {
            // Item transfer preserves the item id: the unique object moves.
            let item = {
                let Some(giver) = ctx.state.roster.get_mut(actor) else {
                    return ActionOutcome::fail(action, "unknown agent");
                };
                match inventory::remove_item_by_kind(&mut giver.inventory, kind) {
                    Ok(item) => item,
                    Err(err) => return ActionOutcome::fail(action, err.to_string()),
                }
            };
            if let Some(receiver) = ctx.state.roster.get_mut(recipient) {
                inventory::add_item(&mut receiver.inventory, item);
            }
        }
    }

    ActionOutcome::ok(
        action,
        format!("You hand the {kind} to {recipient}."),
        vec![EventKind::ItemGiven {
            giver: actor.clone(),
            recipient: recipient.clone(),
            item: kind.to_owned(),
        }],
    )
}

/// `gather`: one unit of the terrain's yield, if it has one.
pub fn gather(ctx: &mut ActionContext<'_>, actor: &AgentName, action: &Action) -> ActionOutcome {
    let Some(position) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    let terrain = ctx.state.grid.get_cell(position).terrain;
    let Some(resource) = terrain.gatherable_resource() else {
        return ActionOutcome::fail(action, "Nothing here can be gathered.");
    };

    if let Some(agent) = ctx.state.roster.get_mut(actor)
        && let Err(err) = inventory::add_stack(&mut agent.inventory, resource, 1)
    {
        return ActionOutcome::fail(action, err.to_string());
    }

    ActionOutcome::ok(
        action,
        format!("You gather one {resource}."),
        vec![EventKind::AgentGathered {
            agent: actor.clone(),
            position,
            resource,
        }],
    )
}

/// Remove one unit (stack) or one item of `kind` from the actor's
/// inventory, returning the item properties for the dropped object.
fn take_from_inventory(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    kind: &str,
) -> Result<BTreeMap<String, serde_json::Value>, String> {
    let Some(agent) = ctx.state.roster.get_mut(actor) else {
        return Err(String::from("unknown agent"));
    };
    match ResourceKind::parse(kind) {
        Some(resource) => inventory::remove_stack(&mut agent.inventory, resource, 1)
            .map(|()| BTreeMap::new())
            .map_err(|err| err.to_string()),
        None => inventory::remove_item_by_kind(&mut agent.inventory, kind)
            .map(|item| item.properties)
            .map_err(|err| err.to_string()),
    }
}
