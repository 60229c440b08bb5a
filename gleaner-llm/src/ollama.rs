use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use gleaner_common::{GleanerError, Result};
use gleaner_http::{HttpClient, RequestOpts};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

/// Local models are slow on page-sized prompts.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);
const PULL_TIMEOUT: Duration = Duration::from_secs(1800);

/// Ollama client for local model inference.
///
/// Expects a running Ollama server (see https://github.com/ollama/ollama).
pub struct OllamaClient {
    client: HttpClient,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaClient {
    /// Create a new client and verify server/model availability.
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let client = HttpClient::new(base_url.trim_end_matches('/'))
            .map_err(|e| GleanerError::Config(format!("invalid Ollama endpoint: {e}")))?
            .with_timeout(GENERATE_TIMEOUT)
            .with_retries(0);

        let ollama_client = Self { client, model };

        let models = ollama_client.fetch_available_models().await?;
        if !models.contains(&ollama_client.model) {
            tracing::info!("Model {} not found locally, pulling...", ollama_client.model);
            ollama_client.pull_model().await?;
        }

        Ok(ollama_client)
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        let tags: TagsResponse = self
            .client
            .get_json("api/tags", RequestOpts::default())
            .await
            .map_err(|_| GleanerError::Llm(OLLAMA_CONNECTION_ERROR.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn pull_model(&self) -> Result<()> {
        let payload = json!({
            "model": self.model,
            "stream": false
        });
        let opts = RequestOpts {
            timeout: Some(PULL_TIMEOUT),
            ..Default::default()
        };

        let _: JsonValue = self
            .client
            .post_json_opts("api/pull", &payload, opts)
            .await
            .map_err(|e| GleanerError::Llm(format!("Failed to pull model: {e}")))?;

        tracing::info!("Successfully pulled model: {}", self.model);
        Ok(())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let mut options = serde_json::Map::new();
        if let Some(temp) = temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tok) = max_tokens {
            options.insert("num_predict".to_string(), json!(max_tok));
        }

        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": options
        });
        if let Some(sys) = system_prompt {
            payload["system"] = json!(sys);
        }

        let resp: GenerateResponse = self
            .client
            .post_json("api/generate", None, &payload)
            .await
            .map_err(|e| GleanerError::Llm(format!("Generate request failed: {e}")))?;

        Ok(LlmResponse {
            text: resp.response,
            model: Some(self.model.clone()),
            tokens_used: resp.eval_count,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.fetch_available_models().await.is_ok())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
