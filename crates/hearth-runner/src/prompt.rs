//! Prompt template loading and rendering via `minijinja`.
//!
//! Three templates: `system.j2` (who the agent is and the reply format),
//! `turn.j2` (the perception rendered for a turn), and `narrate.j2` (the
//! narrator's rewrite instruction). The built-in copies are compiled into
//! the binary; a templates directory, when configured, overrides them so
//! operators can tune agent behaviour without recompiling.

use minijinja::Environment;

use crate::error::RunnerError;

/// The compiled-in default templates.
const SYSTEM_TEMPLATE: &str = include_str!("../templates/system.j2");
const TURN_TEMPLATE: &str = include_str!("../templates/turn.j2");
const NARRATE_TEMPLATE: &str = include_str!("../templates/narrate.j2");

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the agent's reality.
    pub system: String,
    /// User message with the turn's perception or follow-up.
    pub user: String,
}

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// A prompt engine over the built-in templates.
    pub fn builtin() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        add(&mut env, "system", SYSTEM_TEMPLATE.to_owned())?;
        add(&mut env, "turn", TURN_TEMPLATE.to_owned())?;
        add(&mut env, "narrate", NARRATE_TEMPLATE.to_owned())?;
        Ok(Self { env })
    }

    /// A prompt engine loading `system.j2`, `turn.j2`, and `narrate.j2`
    /// from a directory. Missing files fall back to the built-ins.
    pub fn from_dir(dir: &str) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        add(&mut env, "system", load_or(dir, "system.j2", SYSTEM_TEMPLATE))?;
        add(&mut env, "turn", load_or(dir, "turn.j2", TURN_TEMPLATE))?;
        add(&mut env, "narrate", load_or(dir, "narrate.j2", NARRATE_TEMPLATE))?;
        Ok(Self { env })
    }

    /// Render the system and turn messages for a perception payload.
    ///
    /// `context` must contain the serialized perception plus `name`,
    /// `personality`, and `tools`.
    pub fn render_turn(&self, context: &serde_json::Value) -> Result<RenderedPrompt, RunnerError> {
        Ok(RenderedPrompt {
            system: self.render("system", context)?,
            user: self.render("turn", context)?,
        })
    }

    /// Render the narrator instruction for one action result.
    pub fn render_narration(
        &self,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        Ok(RenderedPrompt {
            system: String::from("You narrate a small world, briefly and concretely."),
            user: self.render("narrate", context)?,
        })
    }

    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

fn add(env: &mut Environment<'static>, name: &str, source: String) -> Result<(), RunnerError> {
    env.add_template_owned(name.to_owned(), source)
        .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))
}

fn load_or(dir: &str, filename: &str, fallback: &str) -> String {
    std::fs::read_to_string(format!("{dir}/{filename}")).unwrap_or_else(|_| fallback.to_owned())
}
