//! Provider‑agnostic LLM integration for Gleaner.
//!
//! This crate exposes the common [`traits::LlmClient`] interface and concrete
//! provider implementations for OpenAI and Ollama. It also provides a
//! convenience function to initialize a client from a
//! [`gleaner_common::LlmConfig`].
//!
//! # Examples
//! ```no_run
//! use gleaner_common::{LlmConfig, Result};
//! use gleaner_llm::ensure_llm_ready;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let cfg = LlmConfig::Ollama {
//!     endpoint: "http://localhost:11434".into(),
//!     model: "llama3.2:3b".into(),
//! };
//! let client = ensure_llm_ready(&cfg).await?;
//! assert!(!client.model_name().is_empty());
//! # Ok(())
//! # }
//! ```
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod traits;

use gleaner_common::{GleanerError, LlmConfig};
use std::sync::Arc;
use traits::LlmClient;

/// Build the configured client, pulling the model first when the provider
/// needs it.
pub async fn ensure_llm_ready(
    config: &LlmConfig,
) -> gleaner_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    tracing::info!(
        provider = config.provider_name(),
        model = ?config.model(),
        "llm.init"
    );
    match config {
        #[cfg(feature = "ollama")]
        LlmConfig::Ollama { endpoint, model } => {
            let client = ollama::OllamaClient::new(endpoint.clone(), model.clone()).await?;
            Ok(Arc::new(client))
        }
        #[cfg(feature = "openai")]
        LlmConfig::Openai {
            auth_token,
            model,
            endpoint,
        } => {
            if auth_token.trim().is_empty() || auth_token.contains("${") {
                return Err(GleanerError::Config(
                    "OpenAI API key not provided (set OPENAI_API_KEY or llm.auth_token)"
                        .to_string(),
                ));
            }
            let client =
                openai::OpenAiClient::with_base_url(auth_token.clone(), model.clone(), endpoint)?;
            Ok(Arc::new(client))
        }
        LlmConfig::None => Err(GleanerError::Config("No LLM configured".to_string())),
        #[allow(unreachable_patterns)]
        _ => Err(GleanerError::Config("LLM provider not enabled".to_string())),
    }
}
