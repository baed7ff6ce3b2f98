//! Perception assembly.
//!
//! The perception is the only window an agent has onto the world. It is
//! built at the start of the agent's turn from the current state, clamped
//! to the world bounds and the effective (night-scaled) vision radius.
//! Building it has two deliberate side effects, both evented: the meeting
//! ledger grows for every newly co-visible pair, and the agent's turn and
//! unseen-turn cursors advance.

use hearth_types::{
    AgentName, CellView, ConversationView, EventKind, GridView, InvitationView, InvitationStatus,
    JourneyView, Perception, Rect, SelfView, TimeOfDay, TurnView, VisibleAgent, VisibleObject,
};
use hearth_world::effective_vision;
use hearth_agents::SimState;

/// Build the perception for one agent's turn at `tick`.
///
/// Returns the payload plus the events its side effects produced
/// (`AgentsMet` for new acquaintances, `PerceptionDelivered` for the
/// cursor advances).
pub fn build_perception(
    state: &mut SimState,
    name: &AgentName,
    tick: u64,
    vision_radius: u32,
    night_percent: u32,
    dreams: Vec<String>,
    notices: Vec<String>,
) -> Option<(Perception, Vec<EventKind>)> {
    let agent = state.roster.get(name)?;
    let position = agent.position;
    let time_of_day = TimeOfDay::from_tick(tick);
    let radius = effective_vision(vision_radius, time_of_day, night_percent);

    let mut events = Vec::new();

    // Visible agents; every sighting is a permanent mutual acquaintance.
    let visible_names: Vec<AgentName> = state
        .roster
        .visible_from(name, position, radius)
        .iter()
        .map(|a| a.name.clone())
        .collect();
    for other in &visible_names {
        if state.roster.record_meeting(name, other) {
            events.push(EventKind::AgentsMet {
                a: name.clone(),
                b: other.clone(),
            });
        }
    }

    let agent = state.roster.get(name)?;

    let visible_agents: Vec<VisibleAgent> = visible_names
        .iter()
        .filter_map(|other| state.roster.get(other))
        .map(|other| VisibleAgent {
            name: other.name.clone(),
            position: other.position,
            sleeping: other.sleeping,
        })
        .collect();

    // The visible grid patch, clamped to world bounds.
    let rect = Rect::clamped(position, radius, state.meta.width, state.meta.height);
    let cells: Vec<CellView> = state
        .grid
        .cells_in_rect(rect)
        .into_iter()
        .map(|(pos, cell)| CellView {
            position: pos,
            terrain: cell.terrain,
            walls: cell.walls.iter().copied().collect(),
            doors: cell.doors.iter().copied().collect(),
            place_name: state.grid.place_name(pos).map(|p| p.name.clone()),
        })
        .collect();
    let grid = GridView {
        origin: rect.min,
        width: rect.max.x.saturating_sub(rect.min.x).saturating_add(1),
        height: rect.max.y.saturating_sub(rect.min.y).saturating_add(1),
        cells,
    };

    let visible_objects: Vec<VisibleObject> = state
        .grid
        .objects()
        .values()
        .filter(|o| rect.contains(o.position))
        .map(|o| VisibleObject {
            position: o.position,
            label: o.label(),
        })
        .collect();

    let journey = agent.journey.as_ref().map(|j| JourneyView {
        destination: j.destination,
        remaining_steps: u32::try_from(j.remaining()).unwrap_or(u32::MAX),
    });

    let conversation_id = state.social.active_conversation_of(name).map(|c| c.id);
    let conversation = state.social.active_conversation_of(name).map(|c| {
        ConversationView {
            privacy: c.privacy,
            participants: c.present_participants().cloned().collect(),
            unseen_turns: c
                .unseen_turns(name)
                .into_iter()
                .map(|turn| TurnView {
                    speaker: turn.speaker.clone(),
                    text: turn.text.clone(),
                    tick: turn.tick,
                })
                .collect(),
        }
    });

    let pending_invitations: Vec<InvitationView> = state
        .social
        .invitations()
        .values()
        .filter(|i| i.status == InvitationStatus::Pending && &i.invitee == name)
        .map(|i| InvitationView {
            inviter: i.inviter.clone(),
            privacy: i.privacy,
            created_tick: i.created_tick,
        })
        .collect();

    let perception = Perception {
        tick,
        time_of_day,
        weather: state.meta.weather,
        self_state: SelfView {
            name: name.clone(),
            position,
            personality: agent.personality.clone(),
            stacks: agent.inventory.stacks.clone(),
            items: agent.inventory.items.iter().map(|i| i.kind.clone()).collect(),
        },
        grid,
        visible_agents,
        visible_objects,
        journey,
        conversation,
        pending_invitations,
        dreams,
        notices,
    };

    // Advance the turn cursors; storage applies the same from the event.
    if let Some(agent) = state.roster.get_mut(name) {
        agent.last_turn_tick = tick;
    }
    state.social.mark_seen(name, tick);
    events.push(EventKind::PerceptionDelivered {
        agent: name.clone(),
        conversation: conversation_id,
    });

    Some((perception, events))
}

#[cfg(test)]
mod tests {
    use hearth_types::{Agent, Position, Weather, WorldMeta};
    use hearth_agents::Roster;
    use hearth_social::SocialLedger;
    use hearth_world::WorldGrid;

    use super::*;

    fn state_with(agents: &[(&str, u32, u32)]) -> SimState {
        let mut roster = Roster::new();
        for &(name, x, y) in agents {
            let _ = roster.register(Agent::new(
                AgentName::from(name),
                "m",
                "",
                Position::new(x, y),
            ));
        }
        SimState::new(
            WorldMeta {
                tick: 0,
                width: 30,
                height: 30,
                weather: Weather::Clear,
            },
            WorldGrid::new(30, 30),
            roster,
            SocialLedger::new(),
        )
    }

    #[test]
    fn vision_clamps_to_world_edges() {
        let mut state = state_with(&[("Ash", 0, 0)]);
        let result = build_perception(
            &mut state,
            &AgentName::from("Ash"),
            1,
            8,
            60,
            Vec::new(),
            Vec::new(),
        );
        let Some((perception, _)) = result else {
            assert!(false, "no perception");
            return;
        };
        // No out-of-range cells: the patch starts at the origin.
        assert_eq!(perception.grid.origin, Position::new(0, 0));
        assert_eq!(perception.grid.width, 9);
        assert!(perception
            .grid
            .cells
            .iter()
            .all(|c| c.position.x < 30 && c.position.y < 30));
    }

    #[test]
    fn night_shrinks_the_visible_patch() {
        let mut state = state_with(&[("Ash", 15, 15), ("Birch", 21, 15)]);
        // Tick 3 is night: radius 8 becomes 4, Birch at distance 6 is out.
        let result = build_perception(
            &mut state,
            &AgentName::from("Ash"),
            3,
            8,
            60,
            Vec::new(),
            Vec::new(),
        );
        let Some((perception, events)) = result else {
            assert!(false, "no perception");
            return;
        };
        assert!(perception.visible_agents.is_empty());
        assert!(!events.iter().any(|e| matches!(e, EventKind::AgentsMet { .. })));
    }

    #[test]
    fn sightings_grow_the_meeting_ledger_once() {
        let mut state = state_with(&[("Ash", 5, 5), ("Birch", 7, 5)]);
        let ash = AgentName::from("Ash");

        let first = build_perception(&mut state, &ash, 1, 8, 60, Vec::new(), Vec::new());
        let met = first
            .map(|(_, events)| {
                events
                    .iter()
                    .filter(|e| matches!(e, EventKind::AgentsMet { .. }))
                    .count()
            })
            .unwrap_or(0);
        assert_eq!(met, 1);

        // Second look: already known, no new event.
        let second = build_perception(&mut state, &ash, 2, 8, 60, Vec::new(), Vec::new());
        let met = second
            .map(|(_, events)| {
                events
                    .iter()
                    .filter(|e| matches!(e, EventKind::AgentsMet { .. }))
                    .count()
            })
            .unwrap_or(0);
        assert_eq!(met, 0);

        // And the relation is symmetric.
        let knows = |who: &str, whom: &str| {
            state
                .roster
                .get(&AgentName::from(who))
                .is_some_and(|a| a.known_agents.contains(&AgentName::from(whom)))
        };
        assert!(knows("Ash", "Birch"));
        assert!(knows("Birch", "Ash"));
    }

    #[test]
    fn perception_advances_the_turn_cursor() {
        let mut state = state_with(&[("Ash", 5, 5)]);
        let ash = AgentName::from("Ash");
        let _ = build_perception(&mut state, &ash, 4, 8, 60, Vec::new(), Vec::new());
        assert_eq!(state.roster.get(&ash).map(|a| a.last_turn_tick), Some(4));
    }
}
