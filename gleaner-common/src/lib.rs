//! Common types and utilities shared across Gleaner crates.
//!
//! This crate defines the provider-agnostic LLM configuration, observability
//! helpers, and the shared error type used throughout the Gleaner workspace.
//! It is intentionally lightweight so that every crate can depend on it
//! without pulling in heavy transitive costs.
//!
//! # Overview
//!
//! - [`LlmConfig`]: Provider‑agnostic LLM configuration
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`GleanerError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use gleaner_common::LlmConfig;
//!
//! let cfg = LlmConfig::default();
//! assert_eq!(cfg.provider_name(), "openai");
//! assert_eq!(cfg.model(), Some("gpt-4o"));
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/";
/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Configuration for the LLM provider used for page analysis.
///
/// The tag is `provider`; see the `gleaner-llm` crate for the concrete
/// client implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Openai {
        model: String,
        auth_token: String,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
    },
    Ollama {
        model: String,
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,
    },
    None,
}

fn default_openai_endpoint() -> String {
    DEFAULT_OPENAI_ENDPOINT.into()
}
fn default_ollama_endpoint() -> String {
    DEFAULT_OLLAMA_ENDPOINT.into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::Openai {
            model: "gpt-4o".to_string(),
            auth_token: "${OPENAI_API_KEY}".to_string(),
            endpoint: default_openai_endpoint(),
        }
    }
}

impl LlmConfig {
    /// Short provider label used in logs.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Openai { .. } => "openai",
            Self::Ollama { .. } => "ollama",
            Self::None => "none",
        }
    }

    /// Configured model, if any provider is selected.
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Openai { model, .. } | Self::Ollama { model, .. } => Some(model),
            Self::None => None,
        }
    }
}

/// Error types used across the Gleaner system.
#[derive(thiserror::Error, Debug)]
pub enum GleanerError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The language model provider failed or returned an unusable reply.
    #[error("LLM error: {0}")]
    Llm(String),
}

/// Convenient alias for results that use [`GleanerError`].
pub type Result<T> = std::result::Result<T, GleanerError>;
