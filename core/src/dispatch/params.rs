//! Generation sampling parameters.

use serde::{Deserialize, Serialize};

/// Sampling knobs sent with each completion request.
///
/// `model` overrides the client's configured model for a single call, which
/// lets one batch mix targets. `top_k` is kept here for symmetry with local
/// backends but is only emitted for families whose API accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: Option<u32>,
    pub temperature: f32,
    pub repetition_penalty: f32,
    pub stop: Option<Vec<String>>,
    pub model: Option<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            top_p: 0.8,
            top_k: None,
            temperature: 0.8,
            repetition_penalty: 1.0,
            stop: None,
            model: None,
        }
    }
}

impl GenerationParams {
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn repetition_penalty(mut self, repetition_penalty: f32) -> Self {
        self.repetition_penalty = repetition_penalty;
        self
    }

    pub fn stop(mut self, stop: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let p = GenerationParams::default();
        assert_eq!(p.max_tokens, 512);
        assert_eq!(p.top_p, 0.8);
        assert_eq!(p.top_k, None);
        assert_eq!(p.temperature, 0.8);
        assert_eq!(p.repetition_penalty, 1.0);
        assert_eq!(p.stop, None);
        assert_eq!(p.model, None);
    }

    #[test]
    fn setters_chain() {
        let p = GenerationParams::default()
            .max_tokens(64)
            .top_k(40)
            .stop(["\n"])
            .model("qwen-max");
        assert_eq!(p.max_tokens, 64);
        assert_eq!(p.top_k, Some(40));
        assert_eq!(p.stop, Some(vec!["\n".to_string()]));
        assert_eq!(p.model.as_deref(), Some("qwen-max"));
    }
}
