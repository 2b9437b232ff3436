//! Prompt templating: role meta-template and the dialogue renderer
//!
//! This module provides:
//! - `RoleSpec`, `BeginSpec`, `RoleTable` for describing how each role frames
//!   its turns (begin/end phrases, name-aware variants, fallbacks)
//! - `PromptTemplate` for flattening a `Dialogue` into a prompt string and for
//!   projecting it into a chat-completions message list

mod renderer;
mod role;

pub use renderer::PromptTemplate;
pub use role::{BeginSpec, RoleSpec, RoleTable};

use thiserror::Error;

/// Errors from meta-template construction and dialogue rendering
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("duplicate role in meta template: {0}")]
    DuplicateRole(String),

    #[error("role '{role}' falls back to undeclared role '{fallback}'")]
    UnknownFallback { role: String, fallback: String },

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
