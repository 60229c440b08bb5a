use async_trait::async_trait;
use gleaner_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

/// The model oracle consumed by the extraction agent.
///
/// Providers only implement [`LlmClient::generate`]; the agent talks to the
/// model through [`LlmClient::infer`], so swapping providers never touches
/// orchestration code.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Check if the LLM service is available
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Run a prompt at minimum sampling temperature and return the raw text.
    async fn infer(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        tracing::debug!(
            model = self.model_name(),
            prompt_len = prompt.len(),
            "llm.infer"
        );
        let response = self
            .generate(prompt, system_prompt, max_tokens, Some(0.0))
            .await?;
        tracing::debug!(
            model = self.model_name(),
            response_len = response.text.len(),
            tokens_used = ?response.tokens_used,
            "llm.infer.done"
        );
        Ok(response.text)
    }
}
