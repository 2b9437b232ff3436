mod config;
use config::AgentConfig;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use weft_core::tools::{ContentFetcher, SearchClient, ToolRegistry};
use weft_core::{ChatClient, Dialogue, Message, Turn, ENVIRONMENT};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,weft_core=info,chat_agent=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        eprintln!("usage: chat_agent <question>");
        std::process::exit(2);
    }

    info!(
        target = "chat_agent",
        "Starting chat agent demo: question → web context → dispatch"
    );

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = AgentConfig::load();

    // Tool registry with the built-in web tools
    let registry = ToolRegistry::new();
    registry
        .register(Arc::new(SearchClient::with_config(cfg.search.clone())))
        .await;
    match ContentFetcher::with_config(cfg.fetch.clone()) {
        Ok(fetcher) => registry.register(Arc::new(fetcher)).await,
        Err(e) => warn!(target = "chat_agent", error = %e, "web:fetch unavailable"),
    }

    // Assemble the dialogue: system prompt, optional web context, question
    let mut turns: Vec<Turn> = vec![Message::system(cfg.system_prompt.clone()).into()];
    if cfg.search_context {
        match registry.call("web:search", json!({ "query": question })).await {
            Ok(found) => {
                let lines: Vec<String> = found["results"]
                    .as_array()
                    .map(|results| {
                        results
                            .iter()
                            .filter_map(|hit| {
                                let title = hit["title"].as_str()?;
                                let url = hit["url"].as_str()?;
                                Some(match hit["snippet"].as_str() {
                                    Some(snippet) => format!("- {title} ({url}): {snippet}"),
                                    None => format!("- {title} ({url})"),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                if lines.is_empty() {
                    info!(target = "chat_agent", "No usable search context found");
                } else {
                    info!(target = "chat_agent", hits = lines.len(), "Attaching search context");
                    turns.push(
                        Message::new(
                            ENVIRONMENT,
                            format!("Relevant web results:\n{}", lines.join("\n")),
                        )
                        .into(),
                    );
                }
            }
            Err(e) => {
                warn!(target = "chat_agent", error = %e, "web:search failed; continuing without context")
            }
        }
    }
    turns.push(Message::user(question.clone()).into());

    // Dispatch and print the answer
    let client = ChatClient::new(cfg.client.clone())?;
    info!(target = "chat_agent", model = %cfg.client.model, "Dispatching question");
    match client.send(Dialogue::from(turns)).await {
        Ok(answer) => {
            println!("{answer}");
        }
        Err(e) => {
            error!(target = "chat_agent", error = %e, "Dispatch failed");
            std::process::exit(1);
        }
    }

    Ok(())
}
