use thiserror::Error;

/// Failures surfaced by tools and the registry that dispatches them
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("no tool registered under '{0}'")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("execution timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ToolResult<T> = Result<T, ToolError>;
