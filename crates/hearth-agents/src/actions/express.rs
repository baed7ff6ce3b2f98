//! Expression handlers: `write_sign`, `read_sign`, `name_place`.

use hearth_types::{
    Action, AgentName, EventKind, LookDirection, ObjectId, ObjectKind, WorldObject,
};

use super::{ActionContext, ActionOutcome};

/// `write_sign`: plant a sign with the given text in the actor's cell.
pub fn write_sign(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    text: &str,
) -> ActionOutcome {
    let Some(position) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    if text.trim().is_empty() {
        return ActionOutcome::fail(action, "A sign needs words.");
    }

    let object = WorldObject {
        id: ObjectId::new(),
        position,
        kind: ObjectKind::Sign {
            text: text.to_owned(),
            author: actor.clone(),
        },
    };
    let object_id = object.id;
    ctx.state.grid.insert_object(object);

    ActionOutcome::ok(
        action,
        "You write the sign and plant it firmly.",
        vec![EventKind::SignWritten {
            agent: actor.clone(),
            object: object_id,
            position,
            text: text.to_owned(),
        }],
    )
}

/// `read_sign`: the full text of a sign in an adjacent cell or the
/// actor's own. Never truncated. No state change.
pub fn read_sign(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    direction: LookDirection,
) -> ActionOutcome {
    let Some(from) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    let pos = match direction.as_direction() {
        None => from,
        Some(dir) => {
            let Some(next) = from.step(dir).filter(|p| ctx.state.grid.in_bounds(*p)) else {
                return ActionOutcome::fail(action, "Only the edge of the world lies that way.");
            };
            next
        }
    };

    let sign = ctx
        .state
        .grid
        .objects_at(pos)
        .iter()
        .find_map(|object| match &object.kind {
            ObjectKind::Sign { text, author } => Some((text.clone(), author.clone())),
            ObjectKind::PlacedItem { .. } => None,
        });

    let Some((text, author)) = sign else {
        return ActionOutcome::fail(action, "There is no sign there.");
    };

    let data = serde_json::json!({ "text": text, "author": author });
    ActionOutcome {
        result: hearth_types::ActionResult::ok_with(
            action,
            format!("The sign reads: \"{text}\" -- {author}"),
            data,
        ),
        events: Vec::new(),
    }
}

/// `name_place`: record a name for the actor's current cell.
pub fn name_place(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    name: &str,
) -> ActionOutcome {
    let Some(position) = ctx.state.roster.get(actor).map(|a| a.position) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    if name.trim().is_empty() {
        return ActionOutcome::fail(action, "A place needs a name with letters in it.");
    }

    if let Err(err) = ctx.state.grid.rename_place(position, name, actor.clone()) {
        return ActionOutcome::fail(action, err.to_string());
    }

    ActionOutcome::ok(
        action,
        format!("This place is now called {name}."),
        vec![EventKind::PlaceNamed {
            agent: actor.clone(),
            position,
            name: name.to_owned(),
        }],
    )
}

#[cfg(test)]
mod tests {
    use super::super::execute_action;
    use super::super::testkit::{ctx, state_with};
    use super::*;

    #[test]
    fn sign_roundtrip_keeps_full_text() {
        let mut state = state_with(&[("Ash", 5, 5), ("Birch", 5, 6)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");
        let birch = AgentName::from("Birch");

        let long_text = "Beware the marsh to the east. ".repeat(20);
        let written = execute_action(&mut ctx, &ash, &Action::WriteSign { text: long_text.clone() });
        assert!(written.result.success);

        let read = execute_action(&mut ctx, &birch, &Action::ReadSign { direction: LookDirection::North });
        assert!(read.result.success);
        assert_eq!(
            read.result.data.get("text").and_then(serde_json::Value::as_str),
            Some(long_text.as_str())
        );
    }

    #[test]
    fn reading_an_empty_cell_fails() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(&mut ctx, &ash, &Action::ReadSign { direction: LookDirection::Down });
        assert!(!outcome.result.success);
    }

    #[test]
    fn empty_sign_text_is_refused() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(&mut ctx, &ash, &Action::WriteSign { text: String::from("   ") });
        assert!(!outcome.result.success);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn name_place_records_and_renames() {
        let mut state = state_with(&[("Ash", 7, 7)]);
        let recipes = crate::crafting::RecipeBook::default();
        let mut ctx = ctx(&mut state, &recipes);
        let ash = AgentName::from("Ash");

        let outcome = execute_action(&mut ctx, &ash, &Action::NamePlace { name: String::from("The Hollow") });
        assert!(outcome.result.success);
        assert_eq!(
            ctx.state.grid.place_name(hearth_types::Position::new(7, 7)).map(|p| p.name.as_str()),
            Some("The Hollow")
        );
    }
}
