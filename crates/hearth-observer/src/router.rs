//! Route table for the observer API.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;

/// Assemble the full observer router: queries under `/api`, commands
/// under `/api/operator`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/world", get(handlers::get_world_state))
        .route("/api/agents", get(handlers::get_all_agents))
        .route("/api/agents/{name}", get(handlers::get_agent))
        .route("/api/cells", get(handlers::get_cells_in_rect))
        .route("/api/cells/{x}/{y}", get(handlers::get_cell))
        .route("/api/objects/{x}/{y}", get(handlers::get_objects_at))
        .route("/api/conversations", get(handlers::get_conversations))
        .route("/api/invitations", get(handlers::get_pending_invitations))
        .route("/api/operator/trigger-event", post(operator::trigger_event))
        .route("/api/operator/weather", post(operator::set_weather))
        .route("/api/operator/dream", post(operator::send_dream))
        .route("/api/operator/force-turn", post(operator::force_turn))
        .route("/api/operator/skip-turns", post(operator::skip_turns))
        .route(
            "/api/operator/end-conversation",
            post(operator::end_conversation),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
