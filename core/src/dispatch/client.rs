//! Retrying dispatch client for chat-completions endpoints.

use super::credentials::{redact, KeyRing, OrgRing};
use super::params::GenerationParams;
use super::wire::{self, ModelFamily};
use super::{DispatchError, DispatchResult};
use crate::dialogue::{Dialogue, Message, Turn};
use crate::template::PromptTemplate;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Default endpoint for the hosted OpenAI API
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/chat/completions";

/// Configuration for `ChatClient`, with environment-variable defaults
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub model: String,
    /// API keys rotated across attempts; quota-dead keys are dropped
    pub keys: Vec<String>,
    /// Optional organization identifiers rotated per request
    pub orgs: Vec<String>,
    /// Attempts granted to each dispatch before giving up
    pub retry_budget: u32,
    /// Ask the provider for a JSON-object response
    pub json_mode: bool,
    pub request_timeout_ms: u64,
    /// Pause after a rate-limited attempt
    pub rate_limit_backoff_ms: u64,
    /// Upper bound on in-flight requests within one batch
    pub batch_concurrency: usize,
    /// Base sampling parameters; per-request overrides replace them wholesale
    pub params: GenerationParams,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("WEFT_API_BASE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| OPENAI_API_BASE.to_string()),
            model: std::env::var("WEFT_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            keys: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|key| vec![key])
                .unwrap_or_default(),
            orgs: Vec::new(),
            retry_budget: 2,
            json_mode: false,
            request_timeout_ms: std::env::var("WEFT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000),
            rate_limit_backoff_ms: 1_000,
            batch_concurrency: 20,
            params: GenerationParams::default(),
        }
    }
}

/// One dispatchable unit: a dialogue plus optional parameter overrides
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub dialogue: Dialogue,
    pub params: Option<GenerationParams>,
}

impl ChatRequest {
    pub fn new(dialogue: impl Into<Dialogue>) -> Self {
        Self {
            dialogue: dialogue.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = Some(params);
        self
    }
}

impl From<Dialogue> for ChatRequest {
    fn from(dialogue: Dialogue) -> Self {
        Self::new(dialogue)
    }
}

impl From<(Dialogue, GenerationParams)> for ChatRequest {
    fn from((dialogue, params): (Dialogue, GenerationParams)) -> Self {
        Self {
            dialogue,
            params: Some(params),
        }
    }
}

impl From<&str> for ChatRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for ChatRequest {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<Vec<Turn>> for ChatRequest {
    fn from(turns: Vec<Turn>) -> Self {
        Self::new(turns)
    }
}

impl From<Vec<Message>> for ChatRequest {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}

/// Failures visible only inside the retry loop; each costs one attempt
#[derive(Error, Debug)]
enum RetryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("insufficient quota on current key")]
    QuotaExhausted,

    #[error("provider error: {0}")]
    Provider(String),
}

/// Outcome of a single dispatch attempt
enum Attempt {
    Complete(String),
    Retry(RetryError),
    Fatal(DispatchError),
}

struct ClientInner {
    http: Client,
    cfg: ClientConfig,
    template: PromptTemplate,
    keys: KeyRing,
    orgs: Option<OrgRing>,
}

/// Dispatch client with key rotation and bounded retry.
///
/// Cloning is cheap; clones share the HTTP connection pool and the rotation
/// state, so concurrent callers never reuse a quota-dead key.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<ClientInner>,
}

impl ChatClient {
    /// Build a client over the standard chat role table
    pub fn new(cfg: ClientConfig) -> Result<Self, DispatchError> {
        Self::with_template(cfg, PromptTemplate::chat_default())
    }

    /// Build a client that projects dialogues through a custom template
    pub fn with_template(
        cfg: ClientConfig,
        template: PromptTemplate,
    ) -> Result<Self, DispatchError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| DispatchError::Config(format!("failed to build HTTP client: {e}")))?;
        let keys = KeyRing::new(cfg.keys.clone());
        let orgs = OrgRing::new(cfg.orgs.clone());
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                cfg,
                template,
                keys,
                orgs,
            }),
        })
    }

    pub fn from_env() -> Result<Self, DispatchError> {
        Self::new(ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.cfg
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.inner.template
    }

    /// Number of API keys not yet invalidated
    pub async fn usable_keys(&self) -> usize {
        self.inner.keys.remaining().await
    }

    /// Dispatch one dialogue and return the trimmed assistant text
    pub async fn send(&self, request: impl Into<ChatRequest>) -> DispatchResult {
        self.dispatch(request.into()).await
    }

    /// Dispatch many dialogues concurrently, preserving input order.
    ///
    /// At most `batch_concurrency` requests are in flight at once. Failures
    /// stay in their slot as values; one bad item never aborts its
    /// neighbors, and a panicked worker is reported in place rather than
    /// propagated.
    pub async fn send_batch<I>(&self, requests: I) -> Vec<DispatchResult>
    where
        I: IntoIterator,
        I::Item: Into<ChatRequest>,
    {
        let gate = Arc::new(Semaphore::new(self.inner.cfg.batch_concurrency.max(1)));
        let mut handles = Vec::new();
        for request in requests {
            let request = request.into();
            let client = self.clone();
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                // the gate is never closed while handles are alive
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Err(DispatchError::RetriesExhausted {
                            attempts: 0,
                            last_error: "batch gate closed".to_string(),
                        })
                    }
                };
                client.dispatch(request).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(err) => Err(DispatchError::RetriesExhausted {
                    attempts: 0,
                    last_error: format!("worker task failed: {err}"),
                }),
            });
        }
        results
    }

    async fn dispatch(&self, request: ChatRequest) -> DispatchResult {
        let params = request.params.as_ref().unwrap_or(&self.inner.cfg.params);
        let messages = self.inner.template.messages(&request.dialogue)?;

        let model = params.model.as_deref().unwrap_or(&self.inner.cfg.model);
        let family = ModelFamily::of(model)
            .ok_or_else(|| DispatchError::UnsupportedModel(model.to_string()))?;
        let body = wire::request_body(family, model, &messages, params, self.inner.cfg.json_mode);

        debug!(
            target: "dispatch",
            model = %model,
            turns = messages.len(),
            budget = self.inner.cfg.retry_budget,
            "dispatching dialogue"
        );

        let mut attempts = 0u32;
        let mut last_error = String::new();
        while attempts < self.inner.cfg.retry_budget {
            match self.attempt(&body).await {
                Attempt::Complete(text) => return Ok(text),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retry(err) => {
                    attempts += 1;
                    if matches!(err, RetryError::RateLimited) {
                        debug!(target: "dispatch", attempts, "rate limited, backing off");
                        tokio::time::sleep(Duration::from_millis(
                            self.inner.cfg.rate_limit_backoff_ms,
                        ))
                        .await;
                    }
                    last_error = err.to_string();
                }
            }
        }

        Err(DispatchError::RetriesExhausted {
            attempts,
            last_error,
        })
    }

    /// One shot at the endpoint: select credentials, post, classify the reply
    async fn attempt(&self, body: &serde_json::Value) -> Attempt {
        let key = match self.inner.keys.next_valid().await {
            Some(key) => key,
            None => return Attempt::Fatal(DispatchError::ExhaustedCredentials),
        };

        let mut req = self
            .inner
            .http
            .post(&self.inner.cfg.endpoint)
            .header("content-type", "application/json")
            .bearer_auth(&key);
        if let Some(orgs) = &self.inner.orgs {
            req = req.header("OpenAI-Organization", orgs.next().await);
        }

        let response = match req.json(body).send().await {
            Ok(response) => response,
            Err(err) => {
                error!(target: "dispatch", error = %err, "request failed");
                return Attempt::Retry(RetryError::Transport(err.to_string()));
            }
        };

        // Error payloads also arrive as JSON, so classify by body, not status
        let status = response.status();
        let payload: serde_json::Value = match response.json().await {
            Ok(payload) => payload,
            Err(err) => {
                error!(target: "dispatch", %status, error = %err, "response body was not JSON");
                return Attempt::Retry(RetryError::Decode(err.to_string()));
            }
        };

        if let Some(text) = wire::completion_text(&payload) {
            return Attempt::Complete(text.trim().to_string());
        }

        match wire::error_code(&payload) {
            Some(wire::CODE_RATE_LIMIT) => Attempt::Retry(RetryError::RateLimited),
            Some(wire::CODE_INSUFFICIENT_QUOTA) => {
                warn!(target: "dispatch", key = %redact(&key), "insufficient quota, key invalidated");
                self.inner.keys.invalidate(&key).await;
                Attempt::Retry(RetryError::QuotaExhausted)
            }
            _ => {
                let diagnostic = payload
                    .get("error")
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| format!("status {status}, unrecognized response shape"));
                error!(target: "dispatch", %status, error = %diagnostic, "provider error");
                Attempt::Retry(RetryError::Provider(diagnostic))
            }
        }
    }
}
