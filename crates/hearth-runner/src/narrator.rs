//! The HTTP-backed [`Narrator`] implementation.
//!
//! Simple successful actions keep their local template (the result's own
//! message). Crafting, perception, and failure results go to the model
//! for prose; if the call or render fails the raw message is returned --
//! narration must never break a tick.

use hearth_core::{Narrator, narrator::NarratorError};
use hearth_types::{ActionResult, AgentName};
use tracing::debug;

use crate::llm::LlmBackend;
use crate::prompt::PromptEngine;

/// Actions whose successful results are simple enough to narrate locally.
const LOCAL_ACTIONS: &[&str] = &[
    "walk",
    "approach",
    "journey",
    "drop",
    "give",
    "place_wall",
    "place_door",
    "remove_wall",
    "place_item",
    "write_sign",
    "name_place",
    "speak",
    "invite",
    "accept_invite",
    "decline_invite",
    "join_conversation",
    "leave_conversation",
    "sleep",
];

/// A narrator backed by a small model, with the local fallback built in.
pub struct LlmNarrator {
    backend: Option<LlmBackend>,
    prompts: PromptEngine,
}

impl LlmNarrator {
    /// With a backend: simple successes stay local, the rest go to the
    /// model. Without one every result is narrated locally.
    pub const fn new(backend: Option<LlmBackend>, prompts: PromptEngine) -> Self {
        Self { backend, prompts }
    }

    fn wants_model(result: &ActionResult) -> bool {
        if !result.success {
            return true;
        }
        !LOCAL_ACTIONS.contains(&result.action.as_str())
    }
}

impl Narrator for LlmNarrator {
    async fn narrate(
        &self,
        result: &ActionResult,
        agent: &AgentName,
    ) -> Result<String, NarratorError> {
        let Some(backend) = &self.backend else {
            return Ok(result.message.clone());
        };
        if !Self::wants_model(result) {
            return Ok(result.message.clone());
        }

        let context = serde_json::json!({
            "agent": agent,
            "action": result.action,
            "success": result.success,
            "message": result.message,
            "data": result.data,
        });
        let prompt = self
            .prompts
            .render_narration(&context)
            .map_err(|e| NarratorError(e.to_string()))?;

        match backend.complete(&prompt).await {
            Ok(prose) => Ok(prose.trim().to_owned()),
            Err(err) => {
                debug!(%err, action = %result.action, "narration call failed; using raw message");
                Ok(result.message.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hearth_types::Action;

    use super::*;

    #[tokio::test]
    async fn without_a_backend_everything_is_local() {
        let Ok(prompts) = PromptEngine::builtin() else {
            return;
        };
        let narrator = LlmNarrator::new(None, prompts);
        let result = ActionResult::ok(&Action::Gather, "You gather one wood.");
        let narrated = narrator.narrate(&result, &AgentName::from("Ash")).await;
        assert_eq!(narrated.ok().as_deref(), Some("You gather one wood."));
    }

    #[test]
    fn failures_and_crafting_want_the_model() {
        let failed = ActionResult::fail(&Action::Gather, "Nothing here can be gathered.");
        assert!(LlmNarrator::wants_model(&failed));

        let crafted = ActionResult::ok(
            &Action::Combine { inputs: vec![] },
            "You craft 1 stone_axe.",
        );
        assert!(LlmNarrator::wants_model(&crafted));

        let walked = ActionResult::ok(
            &Action::Walk { direction: hearth_types::Direction::North },
            "You walk north.",
        );
        assert!(!LlmNarrator::wants_model(&walked));
    }
}
