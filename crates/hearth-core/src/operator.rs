//! The observer command queue.
//!
//! Observers never touch the world directly: they enqueue whitelisted
//! commands that the engine drains at the top of the next tick, before
//! invitation expiry. Each command produces at most one event and none
//! can overwrite history.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use hearth_types::{AgentName, ConversationId, Weather};

/// The whitelisted observer commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverCommand {
    /// Inject a world event visible to every agent's next perception.
    TriggerEvent {
        /// The event text.
        text: String,
    },
    /// Set the weather, overriding drift.
    SetWeather {
        /// The new weather.
        weather: Weather,
    },
    /// Deliver a dream to one agent's next perception.
    SendDream {
        /// The dreamer.
        agent: AgentName,
        /// The dream text.
        text: String,
    },
    /// Put one agent at the head of its cluster this tick, ending any
    /// journey trance (and waking it if asleep).
    ForceTurn {
        /// The forced agent.
        agent: AgentName,
    },
    /// Exclude an agent from the acting set for the next `n` ticks.
    SkipTurns {
        /// The skipped agent.
        agent: AgentName,
        /// How many ticks to skip.
        n: u32,
    },
    /// Forcibly end a conversation.
    EndConversation {
        /// The conversation to end.
        id: ConversationId,
    },
}

/// A cloneable handle onto the engine's pending-command queue.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<VecDeque<ObserverCommand>>>,
}

impl CommandQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a command for the next tick.
    pub fn push(&self, command: ObserverCommand) {
        if let Ok(mut queue) = self.inner.lock() {
            queue.push_back(command);
        }
    }

    /// Drain every pending command, in arrival order.
    pub fn drain(&self) -> Vec<ObserverCommand> {
        self.inner
            .lock()
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// How many commands are waiting.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_drain_in_arrival_order() {
        let queue = CommandQueue::new();
        queue.push(ObserverCommand::SetWeather {
            weather: Weather::Foggy,
        });
        queue.push(ObserverCommand::TriggerEvent {
            text: String::from("a cold wind picks up"),
        });

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained.first(), Some(ObserverCommand::SetWeather { .. })));
        assert!(queue.is_empty());
    }
}
