//! End-to-end scenarios: full ticks through the engine, the scripted
//! reasoner, and real on-disk storage.

use hearth_types::{
    Action, AgentName, Direction, EventKind, Position, Privacy, ResourceKind, Terrain, Weather,
    WorldMeta,
};
use hearth_agents::{Roster, SimState};
use hearth_core::{Engine, EngineConfig, MessageNarrator, ObserverCommand, ScriptedReasoner};
use hearth_db::Store;
use hearth_social::SocialLedger;
use hearth_world::WorldGrid;

/// A flat 40x40 grass world with the given agents, snapshots off.
fn test_state(agents: &[(&str, u32, u32)]) -> SimState {
    let mut roster = Roster::new();
    for &(name, x, y) in agents {
        let _ = roster.register(hearth_types::Agent::new(
            AgentName::from(name),
            "test-model",
            "",
            Position::new(x, y),
        ));
    }
    SimState::new(
        WorldMeta {
            tick: 0,
            width: 40,
            height: 40,
            weather: Weather::Clear,
        },
        WorldGrid::new(40, 40),
        roster,
        SocialLedger::new(),
    )
}

fn test_config() -> EngineConfig {
    let Ok(config) = EngineConfig::parse(
        r"
storage:
  snapshot_interval: 0
timing:
  tick_deadline_secs: 5
",
    ) else {
        return EngineConfig::default();
    };
    config
}

async fn engine_over(
    dir: &std::path::Path,
    state: SimState,
) -> Option<Engine<ScriptedReasoner, MessageNarrator>> {
    let store = Store::open(dir).await.ok()?;
    store.init_world(&state).await.ok()?;
    Some(Engine::new(
        test_config(),
        state,
        store,
        ScriptedReasoner::new(),
        MessageNarrator::new(),
    ))
}

#[tokio::test]
async fn walk_and_gather() {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let mut state = test_state(&[("Ash", 5, 5)]);
    let _ = state.grid.set_terrain(Position::new(5, 4), Terrain::Forest);
    let Some(mut engine) = engine_over(dir.path(), state).await else {
        assert!(false, "engine setup failed");
        return;
    };

    let ash = AgentName::from("Ash");
    engine.reasoner().push_turn(
        &ash,
        vec![
            Action::Walk {
                direction: Direction::North,
            },
            Action::Gather,
        ],
    );

    let outcome = engine.tick_once().await;
    let Ok(outcome) = outcome else {
        assert!(false, "tick failed");
        return;
    };
    assert_eq!(outcome.tick, 1);
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::AgentMoved { .. })));
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::AgentGathered { .. })));

    let agent = engine.state().roster.get(&ash);
    assert_eq!(agent.map(|a| a.position), Some(Position::new(5, 4)));
    assert_eq!(agent.map(|a| a.inventory.count(ResourceKind::Wood)), Some(1));
    assert_eq!(engine.state().meta.tick, 1);
}

#[tokio::test]
async fn shelter_symmetry_end_to_end() {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let Some(mut engine) = engine_over(dir.path(), test_state(&[("Ash", 10, 10)])).await else {
        return;
    };
    let ash = AgentName::from("Ash");
    engine.reasoner().push_turn(
        &ash,
        vec![Action::BuildShelter {
            facing: Direction::South,
        }],
    );

    assert!(engine.tick_once().await.is_ok());

    // The persisted world agrees with memory: reload from disk and check.
    let Ok(store) = Store::open(dir.path()).await else {
        return;
    };
    let Ok(loaded) = store.load().await else {
        assert!(false, "reload failed");
        return;
    };
    assert!(loaded.grid.check_wall_symmetry().is_ok());
    assert!(loaded
        .grid
        .get_cell(Position::new(10, 11))
        .doors
        .contains(&Direction::South));

    let structures: Vec<_> = loaded.grid.structures().values().collect();
    assert_eq!(structures.len(), 1);
    assert_eq!(structures.first().map(|s| s.interior.len()), Some(9));
    assert!(structures.first().is_some_and(|s| s.creators.contains(&ash)));
}

#[tokio::test]
async fn invitation_accept_and_expiry() {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let Some(mut engine) =
        engine_over(dir.path(), test_state(&[("Ash", 5, 5), ("Birch", 7, 5)])).await
    else {
        return;
    };
    let ash = AgentName::from("Ash");
    let birch = AgentName::from("Birch");

    // Tick 1: Ash invites Birch.
    engine.reasoner().push_turn(
        &ash,
        vec![Action::Invite {
            invitee: birch.clone(),
            privacy: Privacy::Public,
        }],
    );
    let Ok(first) = engine.tick_once().await else {
        assert!(false, "tick 1 failed");
        return;
    };
    assert!(first
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::InvitationSent { .. }) && e.tick == 1));

    // Tick 2: Birch accepts (within the expiry window).
    engine.reasoner().push_turn(&birch, vec![Action::AcceptInvite]);
    let Ok(second) = engine.tick_once().await else {
        assert!(false, "tick 2 failed");
        return;
    };
    assert!(second
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::InvitationAccepted { .. })));
    assert!(second
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::ConversationStarted { .. })));
    assert!(engine.state().social.active_conversation_of(&ash).is_some());
}

#[tokio::test]
async fn unanswered_invitation_expires_and_starts_nothing() {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let Some(mut engine) =
        engine_over(dir.path(), test_state(&[("Ash", 5, 5), ("Birch", 7, 5)])).await
    else {
        return;
    };
    let ash = AgentName::from("Ash");

    engine.reasoner().push_turn(
        &ash,
        vec![Action::Invite {
            invitee: AgentName::from("Birch"),
            privacy: Privacy::Public,
        }],
    );
    let _ = engine.tick_once().await; // tick 1: sent
    let _ = engine.tick_once().await; // tick 2: still pending
    let Ok(third) = engine.tick_once().await else {
        assert!(false, "tick 3 failed");
        return;
    };

    assert!(third
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::InvitationExpired { .. }) && e.tick == 3));
    assert!(engine.state().social.conversations().is_empty());
}

#[tokio::test]
async fn journey_interrupts_when_company_comes_into_view() {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    // Cedar sits at (17,5): visible (radius 8) once Ash reaches x = 9.
    let Some(mut engine) =
        engine_over(dir.path(), test_state(&[("Ash", 5, 5), ("Cedar", 17, 5)])).await
    else {
        return;
    };
    let ash = AgentName::from("Ash");

    engine.reasoner().push_turn(
        &ash,
        vec![Action::Journey {
            destination: Position::new(20, 5),
        }],
    );

    let mut moves = 0usize;
    let mut interrupted_at = None;
    for _ in 0..10 {
        let Ok(outcome) = engine.tick_once().await else {
            assert!(false, "tick failed");
            return;
        };
        moves = moves.saturating_add(
            outcome
                .events
                .iter()
                .filter(|e| {
                    matches!(&e.kind, EventKind::AgentMoved { agent, .. } if agent == &ash)
                })
                .count(),
        );
        if outcome.events.iter().any(|e| {
            matches!(&e.kind, EventKind::JourneyInterrupted { agent, .. } if agent == &ash)
        }) {
            interrupted_at = Some(outcome.tick);
            break;
        }
    }

    // Exactly four cells covered, then the trance broke.
    assert_eq!(moves, 4);
    assert!(interrupted_at.is_some());
    assert!(engine.state().roster.get(&ash).is_some_and(|a| a.journey.is_none()));

    // The agent acts normally on the following tick.
    engine.reasoner().push_turn(&ash, vec![Action::Gather]);
    let Ok(after) = engine.tick_once().await else {
        return;
    };
    assert!(after
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::AgentGathered { .. })
            || matches!(e.kind, EventKind::PerceptionDelivered { .. })));
}

#[tokio::test]
async fn conversation_created_and_ended_in_the_same_tick() {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let Some(mut engine) =
        engine_over(dir.path(), test_state(&[("Ash", 5, 5), ("Wren", 6, 5)])).await
    else {
        return;
    };
    let ash = AgentName::from("Ash");
    let wren = AgentName::from("Wren");

    // Tick 1: Wren invites Ash.
    engine.reasoner().push_turn(
        &wren,
        vec![Action::Invite {
            invitee: ash.clone(),
            privacy: Privacy::Public,
        }],
    );
    let _ = engine.tick_once().await;

    // Tick 2 (cluster order Ash then Wren): Ash accepts and leaves;
    // Wren, now the last participant, leaves too.
    engine
        .reasoner()
        .push_turn(&ash, vec![Action::AcceptInvite, Action::LeaveConversation]);
    engine.reasoner().push_turn(&wren, vec![Action::LeaveConversation]);
    let Ok(second) = engine.tick_once().await else {
        assert!(false, "tick 2 failed");
        return;
    };

    let started = second
        .events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::ConversationStarted { .. }))
        .count();
    let ended = second
        .events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::ConversationEnded { .. }))
        .count();
    assert_eq!(started, 1);
    assert_eq!(ended, 1);
}

#[tokio::test]
async fn observer_commands_apply_before_the_next_tick() {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let Some(mut engine) = engine_over(dir.path(), test_state(&[("Ash", 5, 5)])).await else {
        return;
    };

    let commands = engine.commands();
    commands.push(ObserverCommand::SetWeather {
        weather: Weather::Foggy,
    });
    commands.push(ObserverCommand::TriggerEvent {
        text: String::from("distant thunder"),
    });

    let Ok(outcome) = engine.tick_once().await else {
        assert!(false, "tick failed");
        return;
    };
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::WeatherChanged { weather: Weather::Foggy })));
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::ObserverTriggered { .. })));
    assert_eq!(engine.state().meta.weather, Weather::Foggy);
}

#[tokio::test]
async fn restart_resumes_from_the_committed_tick() {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let ash = AgentName::from("Ash");
    {
        let mut state = test_state(&[("Ash", 5, 5)]);
        let _ = state.grid.set_terrain(Position::new(5, 5), Terrain::Forest);
        let Some(mut engine) = engine_over(dir.path(), state).await else {
            return;
        };
        for _ in 0..3 {
            engine.reasoner().push_turn(&ash, vec![Action::Gather]);
            assert!(engine.tick_once().await.is_ok());
        }
        assert_eq!(engine.state().meta.tick, 3);
    }

    // A fresh engine over the same directory resumes exactly where the
    // last one committed.
    let Ok(store) = Store::open(dir.path()).await else {
        return;
    };
    let Ok(state) = store.load().await else {
        assert!(false, "reload failed");
        return;
    };
    assert_eq!(state.meta.tick, 3);
    assert_eq!(
        state.roster.get(&ash).map(|a| a.inventory.count(ResourceKind::Wood)),
        Some(3)
    );
    // The session survives restart.
    assert!(state.roster.get(&ash).is_some_and(|a| a.session_id.is_some()));
}
