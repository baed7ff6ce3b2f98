//! Observer API server for the Hearth simulation.
//!
//! A thin Axum HTTP layer over two handles: the read-only store (every
//! query sees a consistent point-in-time view and never blocks the
//! engine) and the engine's command queue (the whitelisted commands land
//! before the next tick). The terminal UI and any other observer clients
//! are pure consumers of this API.

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod state;

pub use error::ObserverError;
pub use router::build_router;
pub use state::AppState;

use std::sync::Arc;

use tracing::info;

/// Bind and serve the observer API on `port`. Returns the join handle of
/// the serving task.
pub async fn spawn_observer(
    port: u16,
    state: Arc<AppState>,
) -> Result<tokio::task::JoinHandle<()>, std::io::Error> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port, "observer API listening");
    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!(%err, "observer API server stopped");
        }
    }))
}
