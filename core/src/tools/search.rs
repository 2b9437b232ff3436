//! Web search backed by the DuckDuckGo Instant Answer API.

use super::args::{ArgSchema, ArgSpec};
use super::error::{ToolError, ToolResult};
use super::traits::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the search client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// API endpoint (default: DuckDuckGo)
    pub api_endpoint: String,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
    /// Results kept after filtering
    pub top_k: usize,
    /// Domains excluded from results
    pub blacklist: Vec<String>,
    /// Attempts before a search is reported failed
    pub max_retry: u32,
    /// Pause between attempts
    pub retry_backoff_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.duckduckgo.com/".to_string(),
            timeout_ms: 10_000,
            user_agent: "weft-agent/0.1".to_string(),
            top_k: 3,
            blacklist: vec![
                "youtube.com".to_string(),
                "bilibili.com".to_string(),
                "researchgate.net".to_string(),
            ],
            max_retry: 3,
            retry_backoff_ms: 2_000,
        }
    }
}

/// Search result item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
}

/// DuckDuckGo API response structure
#[derive(Debug, Deserialize)]
struct DuckDuckGoResponse {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Result {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

/// Web search client with bounded retry and domain filtering
pub struct SearchClient {
    cfg: SearchConfig,
    http: reqwest::Client,
    schema: ArgSchema,
}

impl SearchClient {
    /// Create a search client with default configuration
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(cfg: SearchConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(&cfg.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let schema = ArgSchema::new(
            "web:search",
            vec![
                ArgSpec::required("query", "Search query string"),
                ArgSpec::optional("top_k", "Maximum number of results to return"),
            ],
        );
        Self { cfg, http, schema }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    /// Search, retrying transient failures with a pause between attempts.
    /// `top_k` overrides the configured result cap for this call.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> ToolResult<Vec<SearchHit>> {
        let top_k = top_k.unwrap_or(self.cfg.top_k);
        let mut last_error = String::new();
        for attempt in 1..=self.cfg.max_retry {
            match self.query_once(query).await {
                Ok(raw) => return Ok(self.filter(raw, top_k)),
                Err(err) => {
                    warn!(
                        target: "web_search",
                        attempt,
                        max_retry = self.cfg.max_retry,
                        error = %err,
                        "Search attempt failed"
                    );
                    last_error = err.to_string();
                    if attempt < self.cfg.max_retry {
                        tokio::time::sleep(Duration::from_millis(self.cfg.retry_backoff_ms)).await;
                    }
                }
            }
        }
        Err(ToolError::ExecutionFailed(format!(
            "search failed after {} attempts: {last_error}",
            self.cfg.max_retry
        )))
    }

    async fn query_once(&self, query: &str) -> ToolResult<Vec<SearchHit>> {
        debug!(target: "web_search", query = %query, "Performing DuckDuckGo search");

        let url = format!(
            "{}?q={}&format=json",
            self.cfg.api_endpoint,
            urlencoding::encode(query)
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "search API returned status: {}",
                response.status()
            )));
        }

        let ddg: DuckDuckGoResponse = response.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("failed to parse search response: {e}"))
        })?;

        let mut raw = Vec::new();
        if !ddg.abstract_text.is_empty() {
            raw.push(SearchHit {
                title: "Summary".to_string(),
                url: ddg.abstract_url.clone(),
                snippet: Some(ddg.abstract_text.clone()),
            });
        }
        collect_topics(&ddg.related_topics, &mut raw);
        Ok(raw)
    }

    /// Drop black-listed domains and PDF links, cap at `top_k` in rank order
    fn filter(&self, raw: Vec<SearchHit>, top_k: usize) -> Vec<SearchHit> {
        raw.into_iter()
            .filter(|hit| {
                self.cfg
                    .blacklist
                    .iter()
                    .all(|domain| !hit.url.contains(domain))
                    && !hit.url.ends_with(".pdf")
            })
            .take(top_k)
            .collect()
    }
}

fn collect_topics(topics: &[RelatedTopic], hits: &mut Vec<SearchHit>) {
    for topic in topics {
        match topic {
            RelatedTopic::Result { text, first_url } => {
                if !text.is_empty() && !first_url.is_empty() {
                    hits.push(SearchHit {
                        title: text.clone(),
                        url: first_url.clone(),
                        snippet: None,
                    });
                }
            }
            RelatedTopic::Group { topics } => collect_topics(topics, hits),
        }
    }
}

impl Default for SearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SearchClient {
    fn name(&self) -> &str {
        "web:search"
    }

    fn description(&self) -> &str {
        "Search the web for information using DuckDuckGo"
    }

    fn parameters(&self) -> Value {
        self.schema.to_parameters()
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let args = self.schema.validate(&arguments)?;
        let query = args
            .get("query")
            .and_then(|q| q.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("'query' must be a string".to_string()))?;
        if query.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "query cannot be empty".to_string(),
            ));
        }
        let top_k = args
            .get("top_k")
            .and_then(|k| k.as_u64())
            .map(|k| k as usize);

        let results = self.search(query, top_k).await?;
        Ok(json!({
            "query": query,
            "results": results,
            "count": results.len(),
        }))
    }
}
