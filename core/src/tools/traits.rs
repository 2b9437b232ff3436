use super::error::ToolResult;
use async_trait::async_trait;
use serde_json::Value;

/// A model-invokable capability.
///
/// Implementations are registered with a `ToolRegistry` and invoked by name
/// with JSON arguments. `call` runs under the registry's per-call timeout.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable identifier the model calls the tool by (e.g. "web:fetch")
    fn name(&self) -> &str;

    /// One-line description surfaced to the model
    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments. Tools that take no arguments
    /// can rely on the default empty object schema.
    fn parameters(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    /// Execute with validated-or-raw JSON arguments
    async fn call(&self, arguments: Value) -> ToolResult<Value>;
}
