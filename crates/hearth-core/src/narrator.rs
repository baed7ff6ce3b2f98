//! The narrator: structured action results to prose.
//!
//! For simple actions the engine substitutes a local template (the
//! result's own message); crafting, perception, and failure results go to
//! the external narrator. If narration fails for any reason the engine
//! falls back to the raw `message` -- narration never breaks a tick.

use hearth_types::{ActionResult, AgentName};

/// Errors from a narrator backend. Always recoverable: the caller falls
/// back to the raw message.
#[derive(Debug, thiserror::Error)]
#[error("narrator error: {0}")]
pub struct NarratorError(pub String);

/// Turns one action result into a line of prose for the reasoner.
pub trait Narrator {
    /// Narrate a result for the acting agent.
    fn narrate(
        &self,
        result: &ActionResult,
        agent: &AgentName,
    ) -> impl Future<Output = Result<String, NarratorError>>;
}

/// The local fallback narrator: the result's own message, with structured
/// data appended compactly when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageNarrator;

impl MessageNarrator {
    /// A new message narrator.
    pub const fn new() -> Self {
        Self
    }
}

impl Narrator for MessageNarrator {
    async fn narrate(
        &self,
        result: &ActionResult,
        _agent: &AgentName,
    ) -> Result<String, NarratorError> {
        if result.data.is_null() {
            Ok(result.message.clone())
        } else {
            Ok(format!("{} {}", result.message, result.data))
        }
    }
}

#[cfg(test)]
mod tests {
    use hearth_types::Action;

    use super::*;

    #[tokio::test]
    async fn message_narrator_appends_data() {
        let narrator = MessageNarrator::new();
        let plain = ActionResult::ok(&Action::Gather, "You gather one wood.");
        let narrated = narrator.narrate(&plain, &AgentName::from("Ash")).await;
        assert_eq!(narrated.ok().as_deref(), Some("You gather one wood."));

        let with_data = ActionResult::ok_with(
            &Action::SenseOthers,
            "You sense 1 familiar presences.",
            serde_json::json!({ "readings": [] }),
        );
        let narrated = narrator.narrate(&with_data, &AgentName::from("Ash")).await;
        assert!(narrated.is_ok_and(|s| s.contains("readings")));
    }
}
