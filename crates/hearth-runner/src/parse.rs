//! Parsing model output into typed turn replies.
//!
//! The model is asked for `{"actions": [...], "done": bool}` where each
//! action matches the tool schema (and therefore deserializes straight
//! into [`Action`]). Real models wrap JSON in code fences or leave
//! trailing commas, so parsing tries a few recovery strategies before
//! giving up; an unparseable reply becomes an empty, finished turn -- the
//! agent just idles, it is never penalised.

use hearth_core::TurnReply;
use hearth_types::Action;
use tracing::warn;

use crate::error::RunnerError;

/// Wire shape of the model's reply.
#[derive(Debug, serde::Deserialize)]
struct RawReply {
    #[serde(default)]
    actions: Vec<serde_json::Value>,
    #[serde(default = "default_done")]
    done: bool,
}

const fn default_done() -> bool {
    true
}

/// Parse a model response into a [`TurnReply`].
///
/// Unknown or malformed actions are dropped individually (with a warning)
/// rather than poisoning the whole reply.
pub fn parse_turn(raw: &str) -> TurnReply {
    match try_parse(raw) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(%err, raw, "failed to parse model reply; agent idles");
            TurnReply::done()
        }
    }
}

fn try_parse(raw: &str) -> Result<TurnReply, RunnerError> {
    let trimmed = raw.trim();

    // Strategy 1: direct parse.
    if let Ok(reply) = serde_json::from_str::<RawReply>(trimmed) {
        return Ok(convert(reply));
    }

    // Strategy 2: extract from a markdown code block.
    if let Some(inner) = extract_json_from_codeblock(trimmed)
        && let Ok(reply) = serde_json::from_str::<RawReply>(inner)
    {
        return Ok(convert(reply));
    }

    // Strategy 3: strip trailing commas and retry.
    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(reply) = serde_json::from_str::<RawReply>(&cleaned) {
        return Ok(convert(reply));
    }

    Err(RunnerError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

fn convert(raw: RawReply) -> TurnReply {
    let actions: Vec<Action> = raw
        .actions
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Action>(value.clone()) {
            Ok(action) => Some(action),
            Err(err) => {
                warn!(%err, %value, "dropping malformed action");
                None
            }
        })
        .collect();
    TurnReply {
        actions,
        done: raw.done,
    }
}

/// Pull the contents out of the first ```-fenced block, if any.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = text.get(start.checked_add(3)?..)?;
    // Skip an optional language tag on the fence line.
    let body_start = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// Remove `,` immediately before `}` or `]`.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            let mut lookahead = chars.clone();
            while let Some(&next) = lookahead.peek() {
                if next.is_whitespace() {
                    lookahead.next();
                } else {
                    break;
                }
            }
            if matches!(lookahead.peek(), Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
