//! The action engine: validation and execution of the closed vocabulary.
//!
//! Every action goes through [`execute_action`]: the handler checks its
//! preconditions, computes the deterministic result, and emits zero or more
//! events. A failed action returns a failed [`ActionResult`] with an
//! explanatory message, emits **no** events, and consumes **no** resources --
//! the engine never penalises a bad attempt.

mod build;
mod craft;
mod express;
mod interact;
mod movement;
mod social;

use hearth_types::{
    Action, ActionResult, AgentName, EventKind, Position, TimeOfDay,
};
use hearth_world::{StructureChange, effective_vision};
use tracing::debug;

use crate::crafting::RecipeBook;
use crate::state::SimState;

/// Everything a handler needs: the mutable state plus the tick's fixed
/// parameters.
pub struct ActionContext<'a> {
    /// The mutable simulation state.
    pub state: &'a mut SimState,
    /// The tick being processed. Events are stamped with it at commit.
    pub tick: u64,
    /// Base (daytime) vision radius.
    pub vision_radius: u32,
    /// Night-vision scaling in percent.
    pub night_vision_percent: u32,
    /// The crafting recipe table.
    pub recipes: &'a RecipeBook,
}

impl ActionContext<'_> {
    /// The vision radius in effect right now. Applied identically at every
    /// visibility check.
    pub const fn effective_vision(&self) -> u32 {
        effective_vision(
            self.vision_radius,
            TimeOfDay::from_tick(self.tick),
            self.night_vision_percent,
        )
    }

    /// Whether `target` is within effective vision of `from`.
    pub const fn can_see(&self, from: Position, target: Position) -> bool {
        from.chebyshev(target) <= self.effective_vision()
    }
}

/// The result of one executed action: the structured result plus the
/// events it emitted (empty exactly when `result.success` is false).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The structured result handed back to the reasoner (via narration).
    pub result: ActionResult,
    /// Events to append to the tick context.
    pub events: Vec<EventKind>,
}

impl ActionOutcome {
    /// A failure: message only, no events.
    pub fn fail(action: &Action, message: impl Into<String>) -> Self {
        Self {
            result: ActionResult::fail(action, message),
            events: Vec::new(),
        }
    }

    /// A success with events.
    pub fn ok(action: &Action, message: impl Into<String>, events: Vec<EventKind>) -> Self {
        Self {
            result: ActionResult::ok(action, message),
            events,
        }
    }
}

/// Dispatch one action for `actor`. Total match: every vocabulary entry
/// has a handler; there is no fallback arm to hide an unhandled action in.
pub fn execute_action(
    ctx: &mut ActionContext<'_>,
    actor: &AgentName,
    action: &Action,
) -> ActionOutcome {
    if ctx.state.roster.get(actor).is_none() {
        return ActionOutcome::fail(action, format!("{actor} is not on the roster"));
    }

    let outcome = match action {
        Action::Walk { direction } => movement::walk(ctx, actor, action, *direction),
        Action::Approach { target } => movement::approach(ctx, actor, action, target),
        Action::Journey { destination } => movement::journey(ctx, actor, action, *destination),
        Action::Examine { direction } => interact::examine(ctx, actor, action, *direction),
        Action::SenseOthers => interact::sense_others(ctx, actor, action),
        Action::Take { direction } => interact::take(ctx, actor, action, *direction),
        Action::Drop { kind } => interact::drop_kind(ctx, actor, action, kind),
        Action::Give { kind, recipient } => interact::give(ctx, actor, action, kind, recipient),
        Action::Gather => interact::gather(ctx, actor, action),
        Action::Combine { inputs } => craft::combine(ctx, actor, action, inputs),
        Action::Work {
            material,
            technique,
        } => craft::work(ctx, actor, action, *material, technique),
        Action::Apply { tool, target } => craft::apply(ctx, actor, action, tool, *target),
        Action::BuildShelter { facing } => build::build_shelter(ctx, actor, action, *facing),
        Action::PlaceWall { direction } => build::place_wall(ctx, actor, action, *direction),
        Action::PlaceDoor { direction } => build::place_door(ctx, actor, action, *direction),
        Action::PlaceItem { item } => build::place_item(ctx, actor, action, item),
        Action::RemoveWall { direction } => build::remove_wall(ctx, actor, action, *direction),
        Action::WriteSign { text } => express::write_sign(ctx, actor, action, text),
        Action::ReadSign { direction } => express::read_sign(ctx, actor, action, *direction),
        Action::NamePlace { name } => express::name_place(ctx, actor, action, name),
        Action::Speak { text } => social::speak(ctx, actor, action, text),
        Action::Invite { invitee, privacy } => social::invite(ctx, actor, action, invitee, *privacy),
        Action::AcceptInvite => social::accept_invite(ctx, actor, action),
        Action::DeclineInvite => social::decline_invite(ctx, actor, action),
        Action::JoinConversation { participant } => {
            social::join_conversation(ctx, actor, action, participant)
        }
        Action::LeaveConversation => social::leave_conversation(ctx, actor, action),
        Action::Sleep => sleep(ctx, actor, action),
    };

    debug!(
        tick = ctx.tick,
        agent = %actor,
        action = action.name(),
        success = outcome.result.success,
        events = outcome.events.len(),
        "action executed"
    );
    outcome
}

/// `sleep`: lie down until morning or until company arrives.
fn sleep(ctx: &mut ActionContext<'_>, actor: &AgentName, action: &Action) -> ActionOutcome {
    let Some(agent) = ctx.state.roster.get_mut(actor) else {
        return ActionOutcome::fail(action, "unknown agent");
    };
    if agent.sleeping {
        return ActionOutcome::fail(action, "already asleep");
    }
    agent.sleeping = true;
    let position = agent.position;
    ActionOutcome::ok(
        action,
        "You settle down and drift off.",
        vec![EventKind::AgentSlept {
            agent: actor.clone(),
            position,
        }],
    )
}

/// Convert structure refresh changes into events.
pub(crate) fn structure_events(changes: Vec<StructureChange>) -> Vec<EventKind> {
    changes
        .into_iter()
        .map(|change| match change {
            StructureChange::Formed(structure) => EventKind::StructureFormed { structure },
            StructureChange::Dissolved(id) => EventKind::StructureDissolved { id },
        })
        .collect()
}
