//! Request and response shapes for the chat-completions wire format.

use super::params::GenerationParams;
use crate::dialogue::Message;
use serde_json::{json, Value};
use tracing::debug;

/// Hard ceiling on requested completion tokens
pub const MAX_COMPLETION_TOKENS: u32 = 4096;

/// Provider error code for request-rate throttling
pub(crate) const CODE_RATE_LIMIT: &str = "rate_limit_exceeded";
/// Provider error code for a key whose quota is spent
pub(crate) const CODE_INSUFFICIENT_QUOTA: &str = "insufficient_quota";

/// Supported model families, classified by name prefix.
///
/// This is the single place a model name is interpreted. Anything that does
/// not classify is rejected up front as `DispatchError::UnsupportedModel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Gpt,
    Qwen,
    InternLm,
}

impl ModelFamily {
    /// Classify a model name; `None` means the model is unsupported
    pub fn of(model: &str) -> Option<Self> {
        let lower = model.to_ascii_lowercase();
        if lower.starts_with("gpt") {
            Some(ModelFamily::Gpt)
        } else if lower.starts_with("qwen") {
            Some(ModelFamily::Qwen)
        } else if lower.starts_with("internlm") {
            Some(ModelFamily::InternLm)
        } else {
            None
        }
    }
}

/// Build the JSON body for one completion request.
///
/// Shared fields follow the OpenAI chat schema: `n` is pinned to 1,
/// `max_tokens` is capped, and `repetition_penalty` travels as
/// `frequency_penalty`. The families differ only in `top_k` handling; the
/// OpenAI-style APIs no longer accept it, so the Gpt and Qwen mappings drop
/// it while InternLm passes it through.
pub(crate) fn request_body(
    family: ModelFamily,
    model: &str,
    messages: &[Message],
    params: &GenerationParams,
    json_mode: bool,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages,
        "n": 1,
        "max_tokens": params.max_tokens.min(MAX_COMPLETION_TOKENS),
        "top_p": params.top_p,
        "temperature": params.temperature,
        "frequency_penalty": params.repetition_penalty,
    });

    if let Some(stop) = &params.stop {
        body["stop"] = json!(stop);
    }

    match family {
        ModelFamily::Gpt | ModelFamily::Qwen => {
            if params.top_k.is_some() {
                debug!(target: "dispatch", model = %model, "dropping top_k, not accepted by this API family");
            }
        }
        ModelFamily::InternLm => {
            if let Some(top_k) = params.top_k {
                body["top_k"] = json!(top_k);
            }
        }
    }

    if json_mode {
        body["response_format"] = json!({"type": "json_object"});
    }

    body
}

/// Assistant text from a successful chat-completions response
pub(crate) fn completion_text(v: &Value) -> Option<&str> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}

/// Provider error code, when the response carries an error object
pub(crate) fn error_code(v: &Value) -> Option<&str> {
    v.get("error")?.get("code")?.as_str()
}
