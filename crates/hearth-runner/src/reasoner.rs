//! The HTTP-backed [`Reasoner`] implementation.
//!
//! One transcript per session, capped to a sliding window so prompts stay
//! bounded. `take_turn` renders the perception; `continue_turn` replays
//! the narrated results of the previous batch and asks for more. Session
//! ids are opaque to the engine and persisted on the agent row, so a
//! restarted engine keeps talking into the same transcript.

use std::collections::BTreeMap;
use std::sync::Mutex;

use hearth_core::{Reasoner, ReasonerError, TurnReply};
use hearth_types::{Agent, Perception};
use tracing::debug;
use uuid::Uuid;

use crate::error::RunnerError;
use crate::llm::LlmBackend;
use crate::parse::parse_turn;
use crate::prompt::PromptEngine;

/// Most transcript entries kept per session.
const TRANSCRIPT_WINDOW: usize = 40;

/// One remembered exchange line.
#[derive(Debug, Clone)]
struct TranscriptEntry {
    role: &'static str,
    text: String,
}

/// Per-session memory: who the session belongs to and what was said.
#[derive(Debug, Default)]
struct Session {
    agent_name: String,
    personality: String,
    transcript: Vec<TranscriptEntry>,
}

/// A reasoner speaking to an LLM backend over HTTP.
pub struct LlmReasoner {
    backend: LlmBackend,
    prompts: PromptEngine,
    sessions: Mutex<BTreeMap<String, Session>>,
}

impl LlmReasoner {
    /// Build a reasoner over a backend and a prompt engine.
    pub fn new(backend: LlmBackend, prompts: PromptEngine) -> Self {
        Self {
            backend,
            prompts,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    fn remember(&self, session_id: &str, role: &'static str, text: &str) {
        if let Ok(mut sessions) = self.sessions.lock()
            && let Some(session) = sessions.get_mut(session_id)
        {
            session.transcript.push(TranscriptEntry {
                role,
                text: text.to_owned(),
            });
            let len = session.transcript.len();
            if len > TRANSCRIPT_WINDOW {
                session.transcript.drain(..len.saturating_sub(TRANSCRIPT_WINDOW));
            }
        }
    }

    fn session_context(&self, session_id: &str) -> (String, String, String) {
        self.sessions
            .lock()
            .ok()
            .and_then(|sessions| {
                sessions.get(session_id).map(|s| {
                    let history = s
                        .transcript
                        .iter()
                        .map(|e| format!("[{}] {}", e.role, e.text))
                        .collect::<Vec<_>>()
                        .join("\n");
                    (s.agent_name.clone(), s.personality.clone(), history)
                })
            })
            .unwrap_or_default()
    }

    async fn complete_and_parse(
        &self,
        session_id: &str,
        prompt: crate::prompt::RenderedPrompt,
    ) -> Result<TurnReply, ReasonerError> {
        let raw = self
            .backend
            .complete(&prompt)
            .await
            .map_err(into_reasoner_error)?;
        self.remember(session_id, "model", &raw);
        let reply = parse_turn(&raw);
        debug!(
            session = session_id,
            actions = reply.actions.len(),
            done = reply.done,
            backend = self.backend.name(),
            "turn reply parsed"
        );
        Ok(reply)
    }
}

fn into_reasoner_error(err: RunnerError) -> ReasonerError {
    match err {
        RunnerError::Unusable(message) => ReasonerError::Terminal(message),
        other => ReasonerError::Backend(other.to_string()),
    }
}

impl Reasoner for LlmReasoner {
    async fn begin_session(&self, agent: &Agent) -> Result<String, ReasonerError> {
        let session_id = format!("sess-{}", Uuid::now_v7());
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(
                session_id.clone(),
                Session {
                    agent_name: agent.name.to_string(),
                    personality: agent.personality.clone(),
                    transcript: Vec::new(),
                },
            );
        }
        debug!(agent = %agent.name, session = %session_id, "session opened");
        Ok(session_id)
    }

    async fn take_turn(
        &self,
        session_id: &str,
        perception: &Perception,
        tools: &serde_json::Value,
    ) -> Result<TurnReply, ReasonerError> {
        // A restarted engine hands us a persisted session id we have never
        // seen; recreate its memory from the perception.
        if self.sessions.lock().is_ok_and(|s| !s.contains_key(session_id))
            && let Ok(mut sessions) = self.sessions.lock()
        {
            sessions.insert(
                session_id.to_owned(),
                Session {
                    agent_name: perception.self_state.name.to_string(),
                    personality: perception.self_state.personality.clone(),
                    transcript: Vec::new(),
                },
            );
        }

        let (name, personality, history) = self.session_context(session_id);
        let mut context = serde_json::to_value(perception)
            .map_err(|e| ReasonerError::Backend(format!("perception serialize failed: {e}")))?;
        if let Some(map) = context.as_object_mut() {
            map.insert("name".to_owned(), serde_json::Value::String(name));
            map.insert("personality".to_owned(), serde_json::Value::String(personality));
            map.insert("history".to_owned(), serde_json::Value::String(history));
            map.insert("tools".to_owned(), serde_json::Value::String(tools.to_string()));
        }

        let prompt = self
            .prompts
            .render_turn(&context)
            .map_err(into_reasoner_error)?;
        self.remember(session_id, "world", &prompt.user);
        self.complete_and_parse(session_id, prompt).await
    }

    async fn continue_turn(
        &self,
        session_id: &str,
        narrated_results: &[String],
    ) -> Result<TurnReply, ReasonerError> {
        if narrated_results.is_empty() {
            return Ok(TurnReply::done());
        }
        let (_, _, history) = self.session_context(session_id);
        let results = narrated_results.join("\n");
        let user = format!(
            "{history}\n\nWhat just happened:\n{results}\n\nAnything else this turn? Reply with the same JSON shape; use an empty actions list if you are finished."
        );
        let prompt = crate::prompt::RenderedPrompt {
            system: String::from(
                "Continue your turn. Reply with {\"actions\": [...], \"done\": bool} only.",
            ),
            user,
        };
        self.remember(session_id, "world", &results);
        self.complete_and_parse(session_id, prompt).await
    }
}
