//! Read-only query handlers.
//!
//! One handler per observer query. All of them answer from the read-only
//! store; none have side effects.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use hearth_types::{AgentName, Position, Rect};
use serde::Deserialize;

use crate::error::ObserverError;
use crate::state::AppState;

/// `GET /api/world` -- the world singleton.
pub async fn get_world_state(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let meta = state
        .read
        .get_world_state()
        .await?
        .ok_or_else(|| ObserverError::NotFound(String::from("world not initialised")))?;
    Ok(Json(serde_json::json!({
        "tick": meta.tick,
        "width": meta.width,
        "height": meta.height,
        "weather": meta.weather,
        "time_of_day": meta.time_of_day(),
    })))
}

/// `GET /api/agents` -- every agent.
pub async fn get_all_agents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(state.read.get_all_agents().await?))
}

/// `GET /api/agents/{name}` -- one agent.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let agent = state
        .read
        .get_agent(&AgentName::from(name.as_str()))
        .await?
        .ok_or_else(|| ObserverError::NotFound(format!("no agent named {name}")))?;
    Ok(Json(agent))
}

/// `GET /api/cells/{x}/{y}` -- one cell (default if unstored).
pub async fn get_cell(
    State(state): State<Arc<AppState>>,
    Path((x, y)): Path<(u32, u32)>,
) -> Result<impl IntoResponse, ObserverError> {
    let cell = state
        .read
        .get_cell(Position::new(x, y))
        .await?
        .ok_or_else(|| ObserverError::NotFound(format!("({x}, {y}) is out of bounds")))?;
    Ok(Json(cell))
}

/// Query parameters for the rectangle query.
#[derive(Debug, Deserialize)]
pub struct RectQuery {
    /// West edge (inclusive).
    pub min_x: u32,
    /// North edge (inclusive).
    pub min_y: u32,
    /// East edge (inclusive).
    pub max_x: u32,
    /// South edge (inclusive).
    pub max_y: u32,
}

/// `GET /api/cells?min_x=..&min_y=..&max_x=..&max_y=..` -- a rectangle of
/// cells, row-major.
pub async fn get_cells_in_rect(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RectQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    if query.min_x > query.max_x || query.min_y > query.max_y {
        return Err(ObserverError::InvalidQuery(String::from(
            "min must not exceed max",
        )));
    }
    let rect = Rect {
        min: Position::new(query.min_x, query.min_y),
        max: Position::new(query.max_x, query.max_y),
    };
    let cells = state.read.get_cells_in_rect(rect).await?;
    Ok(Json(cells))
}

/// `GET /api/objects/{x}/{y}` -- objects standing at a cell.
pub async fn get_objects_at(
    State(state): State<Arc<AppState>>,
    Path((x, y)): Path<(u32, u32)>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(state.read.get_objects_at(Position::new(x, y)).await?))
}

/// `GET /api/conversations` -- every conversation, past and present.
pub async fn get_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(state.read.get_conversations().await?))
}

/// `GET /api/invitations` -- invitations still pending.
pub async fn get_pending_invitations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(state.read.get_pending_invitations().await?))
}
