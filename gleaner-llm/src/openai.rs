use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use gleaner_common::{GleanerError, Result};
use gleaner_http::{HttpClient, HttpError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Page-sized prompts take a while to answer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
pub struct ResponsesApiRequest {
    model: String,
    input: String,
    instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsesApiResponse {
    pub id: String,
    pub status: String,
    pub model: String,
    #[serde(default)]
    pub output: Vec<ResponseMessage>,
    #[serde(default)]
    pub usage: Option<ResponseUsage>,
}

/// One element in the `output` array
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<ResponseContent>,
}

/// One part of the message `content`
#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponseUsage {
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

impl OpenAiClient {
    /// Create a client against any Responses-API compatible endpoint
    /// (gateways, proxies, test servers).
    pub fn with_base_url(api_key: String, model: String, base_url: &str) -> Result<Self> {
        let client = HttpClient::new(base_url)
            .map_err(|e| GleanerError::Config(format!("HttpClient init failed: {e}")))?
            .with_timeout(REQUEST_TIMEOUT);

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let instructions = system_prompt
            .unwrap_or("You are a precise web data extraction assistant.")
            .to_string();

        let req = ResponsesApiRequest {
            model: self.model.clone(),
            input: prompt.to_string(),
            instructions,
            temperature,
            max_output_tokens: max_tokens,
        };

        let resp: ResponsesApiResponse = self
            .client
            .post_json("responses", Some(&self.api_key), &req)
            .await
            .map_err(http_to_gleaner)?;

        tracing::debug!(
            response_id = %resp.id,
            status = %resp.status,
            model = %resp.model,
            "openai.response"
        );

        let text = resp
            .output
            .iter()
            .filter(|msg| msg.kind == "message")
            .flat_map(|msg| &msg.content)
            .find(|c| c.kind == "output_text")
            .map(|c| c.text.clone())
            .ok_or_else(|| GleanerError::Llm("response carried no output_text".to_string()))?;

        Ok(LlmResponse {
            text,
            model: Some(resp.model),
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        match self.generate("Respond with just 'OK'", None, Some(16), Some(0.0)).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAi health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

fn http_to_gleaner(e: HttpError) -> GleanerError {
    if e.is_rate_limited() {
        GleanerError::Llm(format!("openai rate limit: {e}"))
    } else if e.is_client_error() {
        GleanerError::Config(format!("openai rejected the request: {e}"))
    } else {
        GleanerError::Llm(format!("{e}"))
    }
}
