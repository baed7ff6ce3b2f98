//! The reasoner: an async, turn-taking oracle with per-agent sessions.
//!
//! The engine treats the reasoner as external. `begin_session` opens a
//! persistent session identity (persisted on the agent row so restart is
//! transparent); `take_turn` presents a perception and the fixed tool
//! schema and returns the actions the agent chose; `continue_turn` feeds
//! narrated results back and collects any follow-up actions until the
//! reply says the turn is done.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use hearth_types::{Action, Agent, AgentName, Perception};

/// Errors from a reasoner backend.
#[derive(Debug, thiserror::Error)]
pub enum ReasonerError {
    /// The backend call failed but the run can continue (the agent just
    /// skips this turn).
    #[error("reasoner backend error: {0}")]
    Backend(String),

    /// The backend is unusable (bad credentials, unreachable endpoint).
    /// Fatal to the run.
    #[error("terminal reasoner error: {0}")]
    Terminal(String),
}

/// One step of a turn: actions to execute, and whether the turn is over.
#[derive(Debug, Clone, Default)]
pub struct TurnReply {
    /// Actions to execute, in the order the reasoner emitted them.
    pub actions: Vec<Action>,
    /// Whether the reasoner signalled completion.
    pub done: bool,
}

impl TurnReply {
    /// A reply that ends the turn with nothing further.
    pub const fn done() -> Self {
        Self {
            actions: Vec::new(),
            done: true,
        }
    }
}

/// A source of agent decisions.
///
/// Implementations may call an LLM over HTTP, follow a script, or stub
/// everything out. The engine is generic over this trait; the agent-turn
/// phase awaits these methods and nothing else.
pub trait Reasoner {
    /// Open (or reopen) a session for an agent, returning its identity.
    fn begin_session(
        &self,
        agent: &Agent,
    ) -> impl Future<Output = Result<String, ReasonerError>>;

    /// Present a perception and the tool schema; collect the first batch
    /// of actions.
    fn take_turn(
        &self,
        session_id: &str,
        perception: &Perception,
        tools: &serde_json::Value,
    ) -> impl Future<Output = Result<TurnReply, ReasonerError>>;

    /// Feed narrated action results back; collect follow-up actions.
    fn continue_turn(
        &self,
        session_id: &str,
        narrated_results: &[String],
    ) -> impl Future<Output = Result<TurnReply, ReasonerError>>;
}

/// A scripted reasoner for tests and dry runs.
///
/// Each agent has a queue of turns; every `take_turn` pops one and plays
/// its actions with `done = true`. Agents without a script idle.
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    scripts: Mutex<BTreeMap<AgentName, VecDeque<Vec<Action>>>>,
}

impl ScriptedReasoner {
    /// An empty script: every agent idles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a turn's worth of actions for an agent.
    pub fn push_turn(&self, agent: &AgentName, actions: Vec<Action>) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(agent.clone()).or_default().push_back(actions);
        }
    }
}

impl Reasoner for ScriptedReasoner {
    async fn begin_session(&self, agent: &Agent) -> Result<String, ReasonerError> {
        Ok(format!("scripted:{}", agent.name))
    }

    async fn take_turn(
        &self,
        session_id: &str,
        _perception: &Perception,
        _tools: &serde_json::Value,
    ) -> Result<TurnReply, ReasonerError> {
        let name = AgentName::from(session_id.strip_prefix("scripted:").unwrap_or(session_id));
        let actions = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.get_mut(&name).and_then(VecDeque::pop_front))
            .unwrap_or_default();
        Ok(TurnReply {
            actions,
            done: true,
        })
    }

    async fn continue_turn(
        &self,
        _session_id: &str,
        _narrated_results: &[String],
    ) -> Result<TurnReply, ReasonerError> {
        Ok(TurnReply::done())
    }
}

#[cfg(test)]
mod tests {
    use hearth_types::{Direction, Position};

    use super::*;

    fn perception() -> Perception {
        Perception {
            tick: 1,
            time_of_day: hearth_types::TimeOfDay::Afternoon,
            weather: hearth_types::Weather::Clear,
            self_state: hearth_types::SelfView {
                name: AgentName::from("Ash"),
                position: Position::new(0, 0),
                personality: String::new(),
                stacks: BTreeMap::new(),
                items: Vec::new(),
            },
            grid: hearth_types::GridView {
                origin: Position::new(0, 0),
                width: 1,
                height: 1,
                cells: Vec::new(),
            },
            visible_agents: Vec::new(),
            visible_objects: Vec::new(),
            journey: None,
            conversation: None,
            pending_invitations: Vec::new(),
            dreams: Vec::new(),
            notices: Vec::new(),
        }
    }

    #[tokio::test]
    async fn scripted_turns_play_in_order() {
        let reasoner = ScriptedReasoner::new();
        let ash = AgentName::from("Ash");
        reasoner.push_turn(&ash, vec![Action::Walk { direction: Direction::North }]);
        reasoner.push_turn(&ash, vec![Action::Gather]);

        let agent = Agent::new(ash, "m", "", Position::new(0, 0));
        let session = reasoner.begin_session(&agent).await.unwrap_or_default();

        let tools = hearth_types::tool_schemas();
        let first = reasoner.take_turn(&session, &perception(), &tools).await;
        assert!(matches!(
            first.ok().and_then(|r| r.actions.into_iter().next()),
            Some(Action::Walk { .. })
        ));
        let second = reasoner.take_turn(&session, &perception(), &tools).await;
        assert!(matches!(
            second.ok().and_then(|r| r.actions.into_iter().next()),
            Some(Action::Gather)
        ));
        // Script exhausted: the agent idles.
        let third = reasoner.take_turn(&session, &perception(), &tools).await;
        assert!(third.is_ok_and(|r| r.actions.is_empty() && r.done));
    }
}
