use crate::config::LlmConfig;
use crate::llm::providers::{http_client, read_body};
use crate::llm::{LlmError, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_url,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

fn response_text(body: &str) -> Result<String, LlmError> {
    match serde_json::from_str::<OllamaResponse>(body) {
        Ok(parsed) => Ok(parsed.response),
        Err(e) => {
            error!("Failed to parse Ollama response: {} - Response was: {}", e, body);
            Err(LlmError::ResponseError(format!(
                "Failed to parse Ollama response: {} - Response was: {}",
                e, body
            )))
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", self.api_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions { temperature: self.temperature },
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let body = read_body("Ollama", response).await?;
        debug!("Raw response from Ollama: {}", body);
        response_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_response_field_ignoring_extras() {
        let body = r#"{
            "model": "sqlcoder",
            "created_at": "2024-01-01T00:00:00Z",
            "response": "SQL: SELECT 1;",
            "done": true
        }"#;
        assert_eq!(response_text(body).unwrap(), "SQL: SELECT 1;");
    }

    #[test]
    fn test_malformed_body_is_response_error() {
        let err = response_text(r#"{"error":"model not found"}"#).unwrap_err();
        assert!(matches!(err, LlmError::ResponseError(ref msg) if msg.contains("model not found")));
    }

    #[test]
    fn test_request_disables_streaming() {
        let request = OllamaRequest {
            model: "m",
            prompt: "p",
            stream: false,
            options: OllamaOptions { temperature: 0.1 },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], false);
        assert_eq!(value["prompt"], "p");
    }
}
