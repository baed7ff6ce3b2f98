//! Movement handlers: `walk`, `approach`, `journey`.

use hearth_types::{Action, AgentName, Direction, EventKind, Journey, Position};

use crate::journey::plan_path;

use super::{ActionContext, ActionOutcome};

/// `walk`: one cardinal step, gated by `can_step`.
pub fn walk(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    direction: Direction,
) -> ActionOutcome {
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    if !ctx.state.grid.can_step(from, direction) {
        return ActionOutcome::fail(action, format!("You cannot step {direction} from here."));
    }
    let Some(to) = from.step(direction) else {
        return ActionOutcome::fail(action, format!("You cannot step {direction} from here."));
    };
    if let Some(agent) = ctx.state.roster.get_mut(actor) {
        agent.position = to;
    }
    ActionOutcome::ok(
        action,
        format!("You walk {direction} to {to}."),
        vec![EventKind::AgentMoved {
            agent: actor.clone(),
            from,
            to,
        }],
    )
}

/// `approach`: one step along the shortest path toward a target currently
/// in vision -- an agent by name, a named place, or a visible object kind.
pub fn approach(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    target: &str,
) -> ActionOutcome {
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };

    let Some(goal) = resolve_target(ctx, actor, from, target) else {
        return ActionOutcome::fail(action, format!("You see no {target} from here."));
    };

    if goal == from {
        return ActionOutcome::fail(action, format!("You are already at {target}."));
    }

    let Some(path) = plan_path(&ctx.state.grid, from, goal) else {
        return ActionOutcome::fail(action, format!("There is no way through to {target}."));
    };
    let Some(&to) = path.get(1) else {
        return ActionOutcome::fail(action, format!("You are already beside {target}."));
    };

    if let Some(agent) = ctx.state.roster.get_mut(actor) {
        agent.position = to;
    }
    ActionOutcome::ok(
        action,
        format!("You move toward {target}, reaching {to}."),
        vec![EventKind::AgentMoved {
            agent: actor.clone(),
            from,
            to,
        }],
    )
}

/// `journey`: plan once, enter trance; the movement phase advances one
/// cell per tick until arrival or interrupt.
pub fn journey(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    destination: Position,
) -> ActionOutcome {
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    if from == destination {
        return ActionOutcome::fail(action, "You are already there.");
    }
    if !ctx.state.grid.passable(destination) {
        return ActionOutcome::fail(action, format!("{destination} is not a place you can stand."));
    }
    let Some(path) = plan_path(&ctx.state.grid, from, destination) else {
        return ActionOutcome::fail(action, format!("No path leads to {destination}."));
    };

    let steps = u32::try_from(path.len().saturating_sub(1)).unwrap_or(u32::MAX);
    if let Some(agent) = ctx.state.roster.get_mut(actor) {
        agent.journey = Some(Journey {
            destination,
            path: path.clone(),
            progress: 0,
        });
    }
    ActionOutcome::ok(
        action,
        format!("You set out for {destination}, {steps} steps away."),
        vec![EventKind::JourneyStarted {
            agent: actor.clone(),
            destination,
            path,
        }],
    )
}

/// Resolve an approach target within the actor's effective vision.
fn resolve_target(
    ctx: &ActionContext<'_>,
    actor: &AgentName,
    from: Position,
    target: &str,
) -> Option<Position> {
    // 1. An agent by name.
    if let Some(other) = ctx.state.roster.get(&AgentName::from(target))
        && &other.name != actor
        && ctx.can_see(from, other.position)
    {
        return Some(other.position);
    }
    // 2. A named place.
    if let Some(place) = ctx.state.grid.find_place(target)
        && ctx.can_see(from, place.position)
    {
        return Some(place.position);
    }
    // 3. A visible object by kind label.
    ctx.state
        .grid
        .objects()
        .values()
        .filter(|o| ctx.can_see(from, o.position))
        .find(|o| o.label().contains(target))
        .map(|o| o.position)
}

#[cfg(test)]
mod tests {
    use hearth_types::Terrain;

    use super::super::testkit::{ctx, paint, state_with};
    use super::super::execute_action;
    use super::*;

    #[test]
    fn walk_moves_north_by_one() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(&mut ctx, &ash, &Action::Walk { direction: Direction::North });
        assert!(outcome.result.success);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(
            ctx.state.roster.get(&ash).map(|a| a.position),
            Some(Position::new(5, 4))
        );
    }

    #[test]
    fn walk_into_water_fails_without_events() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        paint(&mut state, 5, 4, Terrain::Water);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(&mut ctx, &ash, &Action::Walk { direction: Direction::North });
        assert!(!outcome.result.success);
        assert!(outcome.events.is_empty());
        assert_eq!(
            ctx.state.roster.get(&ash).map(|a| a.position),
            Some(Position::new(5, 5))
        );
    }

    #[test]
    fn approach_steps_toward_a_visible_agent() {
        let mut state = state_with(&[("Ash", 5, 5), ("Birch", 9, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(
            &mut ctx,
            &ash,
            &Action::Approach { target: String::from("Birch") },
        );
        assert!(outcome.result.success);
        assert_eq!(
            ctx.state.roster.get(&ash).map(|a| a.position),
            Some(Position::new(6, 5))
        );
    }

    #[test]
    fn approach_fails_on_out_of_sight_targets() {
        let mut state = state_with(&[("Ash", 5, 5), ("Birch", 30, 30)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(
            &mut ctx,
            &ash,
            &Action::Approach { target: String::from("Birch") },
        );
        assert!(!outcome.result.success);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn journey_plans_and_enters_trance() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(
            &mut ctx,
            &ash,
            &Action::Journey { destination: Position::new(20, 5) },
        );
        assert!(outcome.result.success);
        let planned_steps = match outcome.events.first() {
            Some(EventKind::JourneyStarted { path, .. }) => path.len().saturating_sub(1),
            _ => 0,
        };
        assert_eq!(planned_steps, 15);

        let agent = ctx.state.roster.get(&ash);
        assert!(agent.is_some_and(hearth_types::Agent::in_trance));
        // The planned path starts at the agent's current position.
        assert_eq!(
            agent.and_then(|a| a.journey.as_ref()).and_then(|j| j.path.first()),
            Some(&Position::new(5, 5))
        );
    }

    #[test]
    fn journey_to_unreachable_destination_fails_clean() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        paint(&mut state, 20, 5, Terrain::Water);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(
            &mut ctx,
            &ash,
            &Action::Journey { destination: Position::new(20, 5) },
        );
        assert!(!outcome.result.success);
        assert!(ctx.state.roster.get(&ash).is_some_and(|a| a.journey.is_none()));
    }
}
