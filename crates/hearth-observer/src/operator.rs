//! Operator command handlers.
//!
//! The whitelist, and nothing else: trigger an event, set the weather,
//! send a dream, force or skip a turn, end a conversation. Each enqueues
//! one command; the engine applies it before the next tick's invitation
//! expiry, and none can overwrite prior events.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use hearth_core::ObserverCommand;
use hearth_types::{AgentName, ConversationId, Weather};
use uuid::Uuid;

use crate::error::ObserverError;
use crate::state::AppState;

/// Generic acknowledgement.
#[derive(Debug, serde::Serialize)]
struct Ack {
    /// Whether the command was queued.
    ok: bool,
    /// Human-readable note.
    message: String,
}

fn ack(message: impl Into<String>) -> Json<Ack> {
    Json(Ack {
        ok: true,
        message: message.into(),
    })
}

/// Request body for `POST /api/operator/trigger-event`.
#[derive(Debug, serde::Deserialize)]
pub struct TriggerEventRequest {
    /// The event text injected into every agent's next perception.
    pub text: String,
}

/// `POST /api/operator/trigger-event`.
pub async fn trigger_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TriggerEventRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    if body.text.trim().is_empty() {
        return Err(ObserverError::InvalidQuery(String::from("text is empty")));
    }
    state.commands.push(ObserverCommand::TriggerEvent { text: body.text });
    Ok(ack("event queued"))
}

/// Request body for `POST /api/operator/weather`.
#[derive(Debug, serde::Deserialize)]
pub struct SetWeatherRequest {
    /// The weather to set.
    pub weather: Weather,
}

/// `POST /api/operator/weather`.
pub async fn set_weather(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetWeatherRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    state.commands.push(ObserverCommand::SetWeather {
        weather: body.weather,
    });
    Ok(ack("weather queued"))
}

/// Request body for `POST /api/operator/dream`.
#[derive(Debug, serde::Deserialize)]
pub struct SendDreamRequest {
    /// The dreaming agent.
    pub agent: String,
    /// The dream text.
    pub text: String,
}

/// `POST /api/operator/dream`.
pub async fn send_dream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendDreamRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    state.commands.push(ObserverCommand::SendDream {
        agent: AgentName::from(body.agent.as_str()),
        text: body.text,
    });
    Ok(ack(format!("dream queued for {}", body.agent)))
}

/// Request body for `POST /api/operator/force-turn`.
#[derive(Debug, serde::Deserialize)]
pub struct ForceTurnRequest {
    /// The agent to put at the head of its cluster.
    pub agent: String,
}

/// `POST /api/operator/force-turn`.
pub async fn force_turn(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForceTurnRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    state.commands.push(ObserverCommand::ForceTurn {
        agent: AgentName::from(body.agent.as_str()),
    });
    Ok(ack(format!("{} will act first next tick", body.agent)))
}

/// Request body for `POST /api/operator/skip-turns`.
#[derive(Debug, serde::Deserialize)]
pub struct SkipTurnsRequest {
    /// The agent to bench.
    pub agent: String,
    /// For how many ticks.
    pub n: u32,
}

/// `POST /api/operator/skip-turns`.
pub async fn skip_turns(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SkipTurnsRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    if body.n == 0 {
        return Err(ObserverError::InvalidQuery(String::from("n must be at least 1")));
    }
    state.commands.push(ObserverCommand::SkipTurns {
        agent: AgentName::from(body.agent.as_str()),
        n: body.n,
    });
    Ok(ack(format!("{} benched for {} ticks", body.agent, body.n)))
}

/// Request body for `POST /api/operator/end-conversation`.
#[derive(Debug, serde::Deserialize)]
pub struct EndConversationRequest {
    /// The conversation id (UUID).
    pub id: Uuid,
}

/// `POST /api/operator/end-conversation`.
pub async fn end_conversation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EndConversationRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    state.commands.push(ObserverCommand::EndConversation {
        id: ConversationId::from(body.id),
    });
    Ok(ack("conversation end queued"))
}
