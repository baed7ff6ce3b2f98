//! Material handlers: `combine`, `work`, `apply`.
//!
//! All three consult the recipe table. A miss returns a failure with
//! partial-match hints and consumes nothing. The `apply` tool must be
//! carried and is never consumed.

use hearth_types::{Action, AgentName, CraftVerb, EventKind, Item, ItemId, ResourceKind};

use crate::crafting::RecipeOutput;
use crate::inventory;

use super::{ActionContext, ActionOutcome};

/// `combine`: join materials.
pub fn combine(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    inputs: &[ResourceKind],
) -> ActionOutcome {
    if inputs.is_empty() {
        return ActionOutcome::fail(action, "Nothing to combine.");
    }
    craft(ctx, actor, action, CraftVerb::Combine, inputs, None)
}

/// `work`: shape one material with a technique.
pub fn work(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    material: ResourceKind,
    technique: &str,
) -> ActionOutcome {
    craft(ctx, actor, action, CraftVerb::Work, &[material], Some(technique))
}

/// `apply`: use a carried tool on a material. The tool survives.
pub fn apply(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    tool: &str,
    target: ResourceKind,
) -> ActionOutcome {
    let carries_tool = ctx
        .state
        .roster
        .get(actor)
        .is_some_and(|a| a.inventory.find_item(tool).is_some());
    if !carries_tool {
        return ActionOutcome::fail(action, format!("You are not carrying a {tool}."));
    }
    craft(ctx, actor, action, CraftVerb::Apply, &[target], Some(tool))
}

/// Shared crafting flow: exact lookup, atomic consumption, output, hints.
fn craft(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
    verb: CraftVerb,
    inputs: &[ResourceKind],
    technique: Option<&str>,
) -> ActionOutcome {
    let Some(recipe) = ctx.recipes.lookup(verb, inputs, technique).cloned() else {
        let hints = ctx.recipes.hints(inputs);
        let message = if hints.is_empty() {
            String::from("Nothing comes of it.")
        } else {
            String::from("Nothing comes of it, but the materials feel promising.")
        };
        return ActionOutcome {
            result: hearth_types::ActionResult::fail_with(
                action,
                message,
                serde_json::json!({ "hints": hints }),
            ),
            events: Vec::new(),
        };
    };

    let Some(agent) = ctx.state.roster.get_mut(actor) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    if let Err(err) = inventory::remove_all(&mut agent.inventory, &recipe.inputs) {
        return ActionOutcome::fail(action, err.to_string());
    }

    let output_label = recipe.output.label();
    let quantity = recipe.output.quantity();
    let mut crafted_item = None;
    let produced = match &recipe.output {
        RecipeOutput::Stack { kind, quantity } => {
            inventory::add_stack(&mut agent.inventory, *kind, *quantity).err()
        }
        RecipeOutput::Item { kind, properties } => {
            let item = Item {
                id: ItemId::new(),
                kind: kind.clone(),
                properties: properties.clone(),
            };
            crafted_item = Some(item.clone());
            inventory::add_item(&mut agent.inventory, item);
            None
        }
    };
    if let Some(err) = produced {
        // Undo the consumption; an overflowing stack fails the craft whole.
        for &input in &recipe.inputs {
            let _ = inventory::add_stack(&mut agent.inventory, input, 1);
        }
        return ActionOutcome::fail(action, err.to_string());
    }

    let data = serde_json::json!({
        "output": output_label,
        "quantity": quantity,
        "discoveries": recipe.discoveries,
    });
    ActionOutcome {
        result: hearth_types::ActionResult::ok_with(
            action,
            format!("You craft {quantity} {output_label}."),
            data,
        ),
        events: vec![EventKind::CraftSucceeded {
            agent: actor.clone(),
            output: output_label,
            quantity,
            inputs: recipe.inputs.clone(),
            item: crafted_item,
        }],
    }
}
