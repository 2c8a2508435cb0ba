use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::constants; // For OLLAMA_URL and DECISION_MODEL

/// A single prompt sent to the model, with the JSON schema its reply must follow.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub flow: &'static str,
    pub prompt: &'a str,
    pub output_schema: &'a serde_json::Value,
}

/// The external completion capability the flows run on.
///
/// Implementations return the raw model text; parsing and validation belong
/// to the flow.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;
}

// Structures matching Ollama's /api/generate endpoint
#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool, // We want the full response, not a stream
    format: &'a serde_json::Value, // Structured output schema
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    model: Option<String>,
    response: String, // The generated text
    #[serde(default)]
    done: bool,
}

/// [`LanguageModel`] backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaModel {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaModel {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Build from `OLLAMA_URL` and `DECISIONWISE_MODEL`.
    pub fn from_env() -> Self {
        Self::new(constants::OLLAMA_URL.as_str(), constants::DECISION_MODEL.as_str())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    #[instrument(skip(self, request), fields(flow = request.flow, model = %self.model))]
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let ollama_api_url = format!("{}/api/generate", self.base_url);

        debug!(prompt = %request.prompt, "Sending prompt to Ollama");

        let request_payload = OllamaRequest {
            model: &self.model,
            prompt: request.prompt,
            stream: false,
            format: request.output_schema,
        };

        let response = self
            .client
            .post(&ollama_api_url)
            .json(&request_payload)
            .send()
            .await
            .context(format!("Failed to send request to Ollama API at {}", ollama_api_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "Ollama API request failed");
            return Err(anyhow::anyhow!(
                "Ollama API request failed with status {}: {}",
                status, error_body
            ));
        }

        let ollama_response = response
            .json::<OllamaResponse>()
            .await
            .context("Failed to parse JSON response from Ollama API")?;

        debug!(
            response = ?ollama_response.response,
            done = ollama_response.done,
            served_by = ?ollama_response.model,
            "Received Ollama response"
        );

        Ok(ollama_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let model = OllamaModel::new("http://localhost:11434/", "llama3");
        assert_eq!(model.base_url, "http://localhost:11434");
        assert_eq!(model.model(), "llama3");
    }

    #[test]
    fn test_request_serializes_schema_as_format() {
        let schema = serde_json::json!({"type": "object"});
        let payload = OllamaRequest {
            model: "llama3",
            prompt: "pick one",
            stream: false,
            format: &schema,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["stream"], false);
        assert_eq!(value["format"]["type"], "object");
        assert_eq!(value["prompt"], "pick one");
    }
}
