//! Web page fetching with HTML-to-text cleanup.

use super::args::{ArgSchema, ArgSpec};
use super::error::{ToolError, ToolResult};
use super::traits::Tool;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the content fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout for page requests in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            user_agent: "weft-agent/0.1".to_string(),
        }
    }
}

/// Tag-stripping cleanup, compiled once per fetcher
struct HtmlCleaner {
    script: Regex,
    style: Regex,
    comment: Regex,
    tag: Regex,
    newlines: Regex,
}

impl HtmlCleaner {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            script: Regex::new(r"(?is)<script\b[^>]*>.*?</script>")?,
            style: Regex::new(r"(?is)<style\b[^>]*>.*?</style>")?,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            tag: Regex::new(r"(?s)<[^>]+>")?,
            newlines: Regex::new(r"\n+")?,
        })
    }

    /// Reduce an HTML document to its readable text. Tags are dropped,
    /// common entities decoded, and newline runs collapsed.
    fn text(&self, html: &str) -> String {
        let html = html.replace("\r\n", "\n");
        let text = self.script.replace_all(&html, "");
        let text = self.style.replace_all(&text, "");
        let text = self.comment.replace_all(&text, "");
        let text = self.tag.replace_all(&text, "");
        let text = decode_entities(&text);
        self.newlines.replace_all(&text, "\n").trim().to_string()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Fetches a page and reduces it to readable text
pub struct ContentFetcher {
    cfg: FetchConfig,
    http: reqwest::Client,
    cleaner: HtmlCleaner,
    schema: ArgSchema,
}

impl ContentFetcher {
    pub fn new() -> ToolResult<Self> {
        Self::with_config(FetchConfig::default())
    }

    pub fn with_config(cfg: FetchConfig) -> ToolResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(&cfg.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let cleaner = HtmlCleaner::new()
            .map_err(|e| ToolError::Internal(format!("failed to compile cleanup patterns: {e}")))?;
        let schema = ArgSchema::new(
            "web:fetch",
            vec![ArgSpec::required("url", "Address of the page to fetch")],
        );
        Ok(Self {
            cfg,
            http,
            cleaner,
            schema,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.cfg
    }

    /// Fetch a URL and return its cleaned text content
    pub async fn fetch(&self, url: &str) -> ToolResult<String> {
        debug!(target: "web_fetch", url = %url, "Fetching page");

        let response = self.http.get(url).send().await.map_err(|e| {
            warn!(target: "web_fetch", url = %url, error = %e, "Fetch request failed");
            ToolError::ExecutionFailed(format!("fetch request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "web_fetch", url = %url, status = %status, "Fetch returned error status");
            return Err(ToolError::ExecutionFailed(format!(
                "fetch returned status: {status}"
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to read page body: {e}")))?;
        Ok(self.cleaner.text(&html))
    }
}

#[async_trait]
impl Tool for ContentFetcher {
    fn name(&self) -> &str {
        "web:fetch"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its readable text"
    }

    fn parameters(&self) -> Value {
        self.schema.to_parameters()
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let args = self.schema.validate(&arguments)?;
        let url = args
            .get("url")
            .and_then(|u| u.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("'url' must be a string".to_string()))?;

        let content = self.fetch(url).await?;
        Ok(json!({ "url": url, "content": content }))
    }
}
