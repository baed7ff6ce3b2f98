//! Per-agent read-only `.status` files.
//!
//! After each commit the engine writes a small JSON status into
//! `agents/<name>/.status` so agent-owned tooling (journals, notes) can
//! see the world without touching the engine. The rest of each agent's
//! directory is opaque to the engine -- only `.status` is ever written.

use std::path::Path;

use hearth_agents::SimState;
use serde::Serialize;

use crate::error::DbError;

/// The engine-written status record.
#[derive(Debug, Serialize)]
struct StatusFile<'a> {
    tick: u64,
    time_of_day: hearth_types::TimeOfDay,
    weather: hearth_types::Weather,
    position: hearth_types::Position,
    inventory_summary: InventorySummary<'a>,
    written_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
struct InventorySummary<'a> {
    stacks: &'a std::collections::BTreeMap<hearth_types::ResourceKind, u32>,
    items: Vec<&'a str>,
}

/// Write every agent's `.status` file under `data_dir/agents/`.
pub fn write_status_files(state: &SimState, data_dir: &Path) -> Result<(), DbError> {
    for agent in state.roster.agents().values() {
        let dir = data_dir.join("agents").join(agent.name.as_str());
        std::fs::create_dir_all(&dir)?;

        let status = StatusFile {
            tick: state.meta.tick,
            time_of_day: state.meta.time_of_day(),
            weather: state.meta.weather,
            position: agent.position,
            inventory_summary: InventorySummary {
                stacks: &agent.inventory.stacks,
                items: agent.inventory.items.iter().map(|i| i.kind.as_str()).collect(),
            },
            written_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string_pretty(&status)?;
        std::fs::write(dir.join(".status"), json)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use hearth_types::{Agent, AgentName, Position, Weather, WorldMeta};
    use hearth_agents::Roster;
    use hearth_social::SocialLedger;
    use hearth_world::WorldGrid;

    use super::*;

    #[test]
    fn status_files_land_per_agent() {
        let Ok(dir) = tempfile::tempdir() else {
            return;
        };
        let mut roster = Roster::new();
        let _ = roster.register(Agent::new(
            AgentName::from("Rowan"),
            "m",
            "",
            Position::new(3, 4),
        ));
        let state = SimState::new(
            WorldMeta {
                tick: 7,
                width: 10,
                height: 10,
                weather: Weather::Rainy,
            },
            WorldGrid::new(10, 10),
            roster,
            SocialLedger::new(),
        );

        assert!(write_status_files(&state, dir.path()).is_ok());
        let content =
            std::fs::read_to_string(dir.path().join("agents/Rowan/.status")).unwrap_or_default();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap_or_default();
        assert_eq!(parsed.get("tick").and_then(serde_json::Value::as_u64), Some(7));
        assert_eq!(
            parsed.get("time_of_day").and_then(serde_json::Value::as_str),
            Some("night")
        );
    }
}
