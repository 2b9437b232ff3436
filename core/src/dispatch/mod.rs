//! Dialogue dispatch: wire mapping, credential rotation, and the retrying client
//!
//! This module provides:
//! - `GenerationParams` sampling knobs with per-call overrides
//! - `ModelFamily` and the request-body mapping for each supported family
//! - `KeyRing` / `OrgRing` rotating credential state
//! - `ChatClient` for single and batched dispatch with bounded retry

mod client;
mod credentials;
mod params;
mod wire;

pub use client::{ChatClient, ChatRequest, ClientConfig, OPENAI_API_BASE};
pub use credentials::{KeyRing, OrgRing};
pub use params::GenerationParams;
pub use wire::{ModelFamily, MAX_COMPLETION_TOKENS};

use thiserror::Error;

/// Terminal dispatch failures surfaced to callers.
///
/// Transient conditions (connection drops, malformed bodies, throttling,
/// spent keys) are retried internally and only show up here as the
/// `last_error` of `RetriesExhausted`.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("configuration error: {0}")]
    Config(String),

    /// Model name matched no supported family; never sent, never retried
    #[error("unsupported model type: {0}")]
    UnsupportedModel(String),

    /// Every configured API key has been invalidated
    #[error("all API keys have insufficient quota")]
    ExhaustedCredentials,

    /// Retry budget spent without obtaining a completion
    #[error("dispatch failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl From<crate::template::TemplateError> for DispatchError {
    fn from(err: crate::template::TemplateError) -> Self {
        DispatchError::Config(err.to_string())
    }
}

pub type DispatchResult = Result<String, DispatchError>;
