//! Observer queries over the read-only pool.
//!
//! Readers ride WAL's multi-version read path: each query sees a
//! consistent point-in-time view of the database and never blocks the
//! single writer. Everything here is side-effect free.

use std::path::Path;

use hearth_types::{
    Agent, AgentName, Cell, Conversation, Invitation, InvitationStatus, Position, Rect, WorldMeta,
    WorldObject,
};
use sqlx::SqlitePool;

use crate::error::DbError;
use crate::load;
use crate::sqlite;

/// Read-only access for observers. Cheap to clone.
#[derive(Clone)]
pub struct ReadStore {
    pool: SqlitePool,
}

impl ReadStore {
    /// Open a read-only pool over the world directory.
    pub async fn open(dir: &Path) -> Result<Self, DbError> {
        Ok(Self {
            pool: sqlite::open_reader(dir).await?,
        })
    }

    /// The world singleton: tick, bounds, weather.
    pub async fn get_world_state(&self) -> Result<Option<WorldMeta>, DbError> {
        load::load_meta(&self.pool).await
    }

    /// One agent with inventory, if it exists.
    pub async fn get_agent(&self, name: &AgentName) -> Result<Option<Agent>, DbError> {
        load::load_agent(&self.pool, name).await
    }

    /// Every agent, in name order.
    pub async fn get_all_agents(&self) -> Result<Vec<Agent>, DbError> {
        Ok(load::load_agents(&self.pool).await?.into_values().collect())
    }

    /// One cell (the default if unstored), or `None` when out of bounds.
    pub async fn get_cell(&self, pos: Position) -> Result<Option<Cell>, DbError> {
        let Some(meta) = load::load_meta(&self.pool).await? else {
            return Ok(None);
        };
        if !meta.in_bounds(pos) {
            return Ok(None);
        }
        let cells = load::load_cells(&self.pool).await?;
        Ok(Some(cells.get(&pos).cloned().unwrap_or_default()))
    }

    /// All cells in a rectangle intersected with world bounds, including
    /// defaults, row-major.
    pub async fn get_cells_in_rect(&self, rect: Rect) -> Result<Vec<(Position, Cell)>, DbError> {
        let Some(meta) = load::load_meta(&self.pool).await? else {
            return Ok(Vec::new());
        };
        let cells = load::load_cells(&self.pool).await?;
        Ok(rect
            .positions()
            .filter(|pos| meta.in_bounds(*pos))
            .map(|pos| (pos, cells.get(&pos).cloned().unwrap_or_default()))
            .collect())
    }

    /// The objects standing at a position, in id order.
    pub async fn get_objects_at(&self, pos: Position) -> Result<Vec<WorldObject>, DbError> {
        let objects = load::load_objects(&self.pool).await?;
        Ok(objects
            .into_values()
            .filter(|o| o.position == pos)
            .collect())
    }

    /// Every conversation, past and present, in id order.
    pub async fn get_conversations(&self) -> Result<Vec<Conversation>, DbError> {
        Ok(load::load_conversations(&self.pool)
            .await?
            .into_values()
            .collect())
    }

    /// Invitations still awaiting an answer.
    pub async fn get_pending_invitations(&self) -> Result<Vec<Invitation>, DbError> {
        Ok(load::load_invitations(&self.pool)
            .await?
            .into_values()
            .filter(|i| i.status == InvitationStatus::Pending)
            .collect())
    }
}
