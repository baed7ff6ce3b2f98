//! The multi-tick run loop and initial world seeding.

use hearth_types::{Agent, AgentName, Position, Weather, WorldMeta};
use hearth_agents::{Roster, SimState};
use hearth_social::SocialLedger;
use hearth_world::generate_terrain;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::narrator::Narrator;
use crate::reasoner::Reasoner;
use crate::tick::Engine;

/// Summary of a completed run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Ticks attempted.
    pub ticks_run: u64,
    /// The final committed tick.
    pub final_tick: u64,
    /// Total events committed over the run.
    pub events: u64,
    /// Ticks that aborted on an invariant violation and were skipped.
    pub aborted: u64,
}

/// Advance the world `ticks` ticks.
///
/// An invariant violation aborts only its own tick -- the engine has
/// already restored the committed state, so the run continues past it.
/// Storage and terminal reasoner failures stop the run; everything
/// committed so far stays committed.
pub async fn run<R: Reasoner, N: Narrator>(
    engine: &mut Engine<R, N>,
    ticks: u64,
) -> Result<RunSummary, EngineError> {
    let mut events: u64 = 0;
    let mut aborted: u64 = 0;
    for _ in 0..ticks {
        match engine.tick_once().await {
            Ok(outcome) => {
                events = events.saturating_add(u64::try_from(outcome.events.len()).unwrap_or(0));
            }
            Err(EngineError::Invariant { source }) => {
                warn!(%source, "tick aborted; continuing from the committed state");
                aborted = aborted.saturating_add(1);
            }
            Err(fatal) => return Err(fatal),
        }
    }
    let final_tick = engine.state().meta.tick;
    info!(ticks, final_tick, events, aborted, "run complete");
    Ok(RunSummary {
        ticks_run: ticks,
        final_tick,
        events,
        aborted,
    })
}

/// Build the initial world from configuration: generated terrain plus the
/// seeded roster, placed on passable cells spiralling out from the centre
/// with a little breathing room between neighbours.
pub fn seed_world(config: &EngineConfig) -> Result<SimState, EngineError> {
    let width = config.world.width;
    let height = config.world.height;
    let grid = generate_terrain(width, height, config.world.seed)?;

    let mut roster = Roster::new();
    let mut placed: Vec<Position> = Vec::new();
    for seed in &config.world.agents {
        let Some(position) = find_spawn(&grid, &placed) else {
            continue;
        };
        placed.push(position);
        let agent = Agent::new(
            AgentName::from(seed.name.as_str()),
            seed.model_id.as_str(),
            seed.personality.as_str(),
            position,
        );
        info!(agent = %agent.name, %position, "agent placed");
        if roster.register(agent).is_err() {
            // Duplicate names in config: first one wins.
            placed.pop();
        }
    }

    Ok(SimState::new(
        WorldMeta {
            tick: 0,
            width,
            height,
            weather: Weather::Clear,
        },
        grid,
        roster,
        SocialLedger::new(),
    ))
}

/// First passable cell, spiralling out from the centre, at least four
/// cells from every earlier spawn.
fn find_spawn(grid: &hearth_world::WorldGrid, placed: &[Position]) -> Option<Position> {
    let center = Position::new(grid.width() / 2, grid.height() / 2);
    let max_radius = grid.width().max(grid.height());
    for radius in 0..max_radius {
        let rect = hearth_types::Rect::clamped(center, radius, grid.width(), grid.height());
        for pos in rect.positions() {
            if pos.chebyshev(center) != radius {
                continue;
            }
            if !grid.passable(pos) {
                continue;
            }
            if placed.iter().any(|p| p.chebyshev(pos) < 4) {
                continue;
            }
            return Some(pos);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_places_every_configured_agent() {
        let config = EngineConfig::default();
        let state = seed_world(&config);
        let Ok(state) = state else {
            assert!(false, "seed failed");
            return;
        };
        assert_eq!(state.roster.len(), config.world.agents.len());
        for agent in state.roster.agents().values() {
            assert!(state.grid.passable(agent.position));
        }
    }

    #[test]
    fn spawns_are_spread_apart() {
        let config = EngineConfig::default();
        let Ok(state) = seed_world(&config) else {
            return;
        };
        let positions: Vec<Position> = state
            .roster
            .agents()
            .values()
            .map(|a| a.position)
            .collect();
        for (i, a) in positions.iter().enumerate() {
            for b in positions.iter().skip(i.saturating_add(1)) {
                assert!(a.chebyshev(*b) >= 4);
            }
        }
    }

    #[test]
    fn seeding_is_deterministic() {
        let config = EngineConfig::default();
        let a = seed_world(&config).ok().map(|s| {
            s.roster
                .agents()
                .values()
                .map(|a| a.position)
                .collect::<Vec<_>>()
        });
        let b = seed_world(&config).ok().map(|s| {
            s.roster
                .agents()
                .values()
                .map(|a| a.position)
                .collect::<Vec<_>>()
        });
        assert_eq!(a, b);
    }
}
