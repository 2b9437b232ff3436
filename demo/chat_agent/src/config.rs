use std::fs;
use std::path::Path;

use weft_core::tools::{FetchConfig, SearchConfig};
use weft_core::ClientConfig;

/// High-level configuration for the chat agent demo
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub client: ClientConfig,
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    /// Gather web search context for the question before dispatching
    pub search_context: bool,
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
            search_context: std::env::var("WEFT_SEARCH_CONTEXT")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            system_prompt: std::env::var("WEFT_SYSTEM_PROMPT").unwrap_or_else(|_| {
                "You are a helpful and concise assistant. Answer briefly and clearly.".into()
            }),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file (path via WEFT_AGENT_CONFIG or ./chat_agent.toml),
    /// overlaying values onto sane defaults and env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("WEFT_AGENT_CONFIG").unwrap_or_else(|_| "chat_agent.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target = "chat_agent", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<AgentToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target = "chat_agent", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "chat_agent", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AgentToml {
    pub search_context: Option<bool>,
    pub system_prompt: Option<String>,
    pub client: Option<ClientToml>,
    pub search: Option<SearchToml>,
    pub fetch: Option<FetchToml>,
}

impl AgentToml {
    fn overlay(self, mut base: AgentConfig) -> AgentConfig {
        if let Some(s) = self.search_context {
            base.search_context = s;
        }
        if let Some(s) = self.system_prompt {
            base.system_prompt = s;
        }
        if let Some(c) = self.client {
            c.apply(&mut base.client);
        }
        if let Some(s) = self.search {
            s.apply(&mut base.search);
        }
        if let Some(f) = self.fetch {
            f.apply(&mut base.fetch);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ClientToml {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub keys: Option<Vec<String>>,
    pub orgs: Option<Vec<String>>,
    pub retry_budget: Option<u32>,
    pub json_mode: Option<bool>,
    pub request_timeout_ms: Option<u64>,
    pub rate_limit_backoff_ms: Option<u64>,
    pub batch_concurrency: Option<usize>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}
impl ClientToml {
    fn apply(self, c: &mut ClientConfig) {
        if let Some(x) = self.endpoint {
            c.endpoint = x;
        }
        if let Some(x) = self.model {
            c.model = x;
        }
        if let Some(x) = self.keys {
            c.keys = x;
        }
        if let Some(x) = self.orgs {
            c.orgs = x;
        }
        if let Some(x) = self.retry_budget {
            c.retry_budget = x;
        }
        if let Some(x) = self.json_mode {
            c.json_mode = x;
        }
        if let Some(x) = self.request_timeout_ms {
            c.request_timeout_ms = x;
        }
        if let Some(x) = self.rate_limit_backoff_ms {
            c.rate_limit_backoff_ms = x;
        }
        if let Some(x) = self.batch_concurrency {
            c.batch_concurrency = x;
        }
        if let Some(x) = self.max_tokens {
            c.params.max_tokens = x;
        }
        if let Some(x) = self.temperature {
            c.params.temperature = x;
        }
        if let Some(x) = self.top_p {
            c.params.top_p = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SearchToml {
    pub api_endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub top_k: Option<usize>,
    pub blacklist: Option<Vec<String>>,
    pub max_retry: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}
impl SearchToml {
    fn apply(self, s: &mut SearchConfig) {
        if let Some(x) = self.api_endpoint {
            s.api_endpoint = x;
        }
        if let Some(x) = self.timeout_ms {
            s.timeout_ms = x;
        }
        if let Some(x) = self.user_agent {
            s.user_agent = x;
        }
        if let Some(x) = self.top_k {
            s.top_k = x;
        }
        if let Some(x) = self.blacklist {
            s.blacklist = x;
        }
        if let Some(x) = self.max_retry {
            s.max_retry = x;
        }
        if let Some(x) = self.retry_backoff_ms {
            s.retry_backoff_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct FetchToml {
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}
impl FetchToml {
    fn apply(self, f: &mut FetchConfig) {
        if let Some(x) = self.timeout_ms {
            f.timeout_ms = x;
        }
        if let Some(x) = self.user_agent {
            f.user_agent = x;
        }
    }
}
