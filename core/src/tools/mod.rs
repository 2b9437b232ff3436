//! Async tool layer: argument schemas, the registry, and the web tools
//!
//! This module provides:
//! - the `Tool` trait plus `ToolError`/`ToolResult`
//! - `ArgSchema` for validating model-produced JSON arguments
//! - `ToolRegistry` for dispatching tool calls with a timeout
//! - `ContentFetcher` and `SearchClient`, the built-in web tools

pub mod args;
pub mod error;
pub mod fetch;
pub mod registry;
pub mod search;
pub mod traits;

// Re-export common types
pub use args::{ArgSchema, ArgSpec};
pub use error::{ToolError, ToolResult};
pub use fetch::{ContentFetcher, FetchConfig};
pub use registry::ToolRegistry;
pub use search::{SearchClient, SearchConfig, SearchHit};
pub use traits::Tool;
