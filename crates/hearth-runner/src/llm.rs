//! HTTP transport to the language models.
//!
//! One [`LlmBackend`] per configured model. The wire protocol -- the
//! Anthropic Messages API or an OpenAI-compatible chat endpoint -- is a
//! small [`Dialect`] value the backend consults when it builds the
//! request body and digs the reply text back out of the response.
//! Everything else is shared: the pooled `reqwest` client with its
//! per-call timeout, the output-token ceiling, and the split between
//! terminal failures (rejected key, missing endpoint) and retryable ones
//! (the affected agent just idles for a turn).

use std::time::Duration;

use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

/// Which wire protocol the endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// The Anthropic Messages API: `x-api-key` auth, top-level system
    /// field, reply text under `content[0].text`.
    Anthropic,
    /// An OpenAI-compatible chat completions endpoint (also DeepSeek and
    /// Ollama): bearer auth, system as the first message, reply text
    /// under `choices[0].message.content`.
    OpenAi,
}

impl Dialect {
    /// Resolve a config string. Anything unrecognised gets the Anthropic
    /// dialect, matching the config default.
    pub fn resolve(name: &str) -> Self {
        if name.eq_ignore_ascii_case("openai") {
            Self::OpenAi
        } else {
            Self::Anthropic
        }
    }

    /// Short name for logging.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai-compatible",
        }
    }

    fn endpoint(self, base_url: &str) -> String {
        match self {
            Self::Anthropic => format!("{base_url}/messages"),
            Self::OpenAi => format!("{base_url}/chat/completions"),
        }
    }

    fn request_body(
        self,
        model: &str,
        max_output_tokens: u32,
        prompt: &RenderedPrompt,
    ) -> serde_json::Value {
        match self {
            Self::Anthropic => serde_json::json!({
                "model": model,
                "max_tokens": max_output_tokens,
                "system": prompt.system,
                "messages": [
                    { "role": "user", "content": prompt.user }
                ],
            }),
            Self::OpenAi => serde_json::json!({
                "model": model,
                "max_tokens": max_output_tokens,
                "messages": [
                    { "role": "system", "content": prompt.system },
                    { "role": "user", "content": prompt.user }
                ],
                "response_format": { "type": "json_object" },
            }),
        }
    }

    fn authorize(self, request: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        match self {
            Self::Anthropic => request
                .header("x-api-key", api_key)
                .header("anthropic-version", "2023-06-01"),
            Self::OpenAi => request.bearer_auth(api_key),
        }
    }

    /// Pull the reply text out of a successful response body.
    fn reply_text(self, json: &serde_json::Value) -> Option<String> {
        let text = match self {
            Self::Anthropic => json.get("content")?.get(0)?.get("text")?,
            Self::OpenAi => json
                .get("choices")?
                .get(0)?
                .get("message")?
                .get("content")?,
        };
        text.as_str().map(ToOwned::to_owned)
    }
}

/// Connection settings for one model.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// Base API URL (e.g. `https://api.anthropic.com/v1`).
    pub api_url: String,
    /// API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Ceiling on output tokens per call.
    pub max_output_tokens: u32,
    /// Timeout for one HTTP call, in seconds.
    pub request_timeout_secs: u64,
}

/// A model endpoint the runner can complete prompts against.
pub struct LlmBackend {
    client: reqwest::Client,
    dialect: Dialect,
    config: LlmBackendConfig,
}

impl LlmBackend {
    /// Build a backend with its own pooled client and per-call timeout.
    pub fn new(dialect: Dialect, config: LlmBackendConfig) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| RunnerError::Unusable(format!("http client setup failed: {e}")))?;
        Ok(Self {
            client,
            dialect,
            config,
        })
    }

    /// Short name for logging.
    pub const fn name(&self) -> &'static str {
        self.dialect.name()
    }

    /// Send a prompt and return the model's raw reply text.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = self.dialect.endpoint(&self.config.api_url);
        let body =
            self.dialect
                .request_body(&self.config.model, self.config.max_output_tokens, prompt);
        let request = self
            .dialect
            .authorize(self.client.post(&url), &self.config.api_key)
            .json(&body);

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RunnerError::LlmBackend(format!("{} call timed out", self.name()))
            } else {
                RunnerError::LlmBackend(format!("{} call failed: {e}", self.name()))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(self.name(), status, &detail));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            RunnerError::LlmBackend(format!("{} reply was not JSON: {e}", self.name()))
        })?;
        self.dialect.reply_text(&json).ok_or_else(|| {
            RunnerError::LlmBackend(format!("{} reply carried no text", self.name()))
        })
    }
}

/// Split HTTP failures into terminal and retryable. A rejected key or a
/// missing endpoint will not fix itself across ticks; rate limits and
/// server hiccups might.
fn classify_status(backend: &str, status: reqwest::StatusCode, detail: &str) -> RunnerError {
    if matches!(status.as_u16(), 401 | 403 | 404) {
        RunnerError::Unusable(format!("{backend} refused us ({status}): {detail}"))
    } else {
        RunnerError::LlmBackend(format!("{backend} answered {status}: {detail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> RenderedPrompt {
        RenderedPrompt {
            system: String::from("You are Rowan."),
            user: String::from("What do you do?"),
        }
    }

    #[test]
    fn dialect_resolution_defaults_to_anthropic() {
        assert_eq!(Dialect::resolve("openai"), Dialect::OpenAi);
        assert_eq!(Dialect::resolve("OpenAI"), Dialect::OpenAi);
        assert_eq!(Dialect::resolve("anthropic"), Dialect::Anthropic);
        assert_eq!(Dialect::resolve("something-else"), Dialect::Anthropic);
    }

    #[test]
    fn endpoints_follow_the_dialect() {
        assert_eq!(
            Dialect::Anthropic.endpoint("https://api.example/v1"),
            "https://api.example/v1/messages"
        );
        assert_eq!(
            Dialect::OpenAi.endpoint("https://api.example/v1"),
            "https://api.example/v1/chat/completions"
        );
    }

    #[test]
    fn anthropic_body_keeps_system_at_the_top_level() {
        let body = Dialect::Anthropic.request_body("some-model", 512, &prompt());
        assert_eq!(
            body.get("system").and_then(serde_json::Value::as_str),
            Some("You are Rowan.")
        );
        assert_eq!(
            body.get("max_tokens").and_then(serde_json::Value::as_u64),
            Some(512)
        );
        let messages = body.get("messages").and_then(serde_json::Value::as_array);
        assert_eq!(messages.map(Vec::len), Some(1));
    }

    #[test]
    fn openai_body_puts_system_in_the_message_list() {
        let body = Dialect::OpenAi.request_body("some-model", 512, &prompt());
        assert!(body.get("system").is_none());
        let messages = body.get("messages").and_then(serde_json::Value::as_array);
        assert_eq!(messages.map(Vec::len), Some(2));
        let first_role = body
            .get("messages")
            .and_then(|m| m.get(0))
            .and_then(|m| m.get("role"))
            .and_then(serde_json::Value::as_str);
        assert_eq!(first_role, Some("system"));
    }

    #[test]
    fn reply_text_extraction_per_dialect() {
        let anthropic = serde_json::json!({
            "content": [{ "type": "text", "text": "{\"actions\":[]}" }]
        });
        assert_eq!(
            Dialect::Anthropic.reply_text(&anthropic).as_deref(),
            Some("{\"actions\":[]}")
        );

        let openai = serde_json::json!({
            "choices": [{ "message": { "content": "{\"actions\":[]}" } }]
        });
        assert_eq!(
            Dialect::OpenAi.reply_text(&openai).as_deref(),
            Some("{\"actions\":[]}")
        );

        assert_eq!(Dialect::Anthropic.reply_text(&serde_json::json!({})), None);
        assert_eq!(
            Dialect::OpenAi.reply_text(&serde_json::json!({ "choices": [] })),
            None
        );
    }

    #[test]
    fn auth_failures_are_terminal_but_rate_limits_are_not() {
        let err = classify_status("anthropic", reqwest::StatusCode::UNAUTHORIZED, "no key");
        assert!(matches!(err, RunnerError::Unusable(_)));
        let err = classify_status("anthropic", reqwest::StatusCode::NOT_FOUND, "no model");
        assert!(matches!(err, RunnerError::Unusable(_)));
        let err = classify_status(
            "anthropic",
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down",
        );
        assert!(matches!(err, RunnerError::LlmBackend(_)));
    }
}
