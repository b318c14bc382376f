use crate::config::LlmConfig;
use crate::llm::providers::{http_client, read_body};
use crate::llm::{LlmError, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI-compatible chat completions endpoint.
pub struct RemoteLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct PromptResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl RemoteLlmProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config.api_url.clone().ok_or_else(|| {
            LlmError::ConfigError("API URL is required for remote LLM provider".to_string())
        })?;

        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::ConfigError("API key is required for remote LLM provider".to_string())
        })?;

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

fn first_choice(body: &str) -> Result<String, LlmError> {
    let response: PromptResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ResponseError(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| LlmError::ResponseError("No choices in response".to_string()))
}

#[async_trait]
impl TextGenerator for RemoteLlmProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = PromptRequest {
            model: &self.model,
            messages: vec![Message { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: 2000,
        };

        debug!("Sending chat completion request to {}", self.api_url);
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let body = read_body("Remote LLM", response).await?;
        first_choice(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_first_choice() {
        let body = r#"{"choices":[
            {"message":{"role":"assistant","content":"SQL: SELECT 1;"}},
            {"message":{"content":"other"}}
        ]}"#;
        assert_eq!(first_choice(body).unwrap(), "SQL: SELECT 1;");
    }

    #[test]
    fn test_empty_choices_is_response_error() {
        assert!(matches!(first_choice(r#"{"choices":[]}"#), Err(LlmError::ResponseError(_))));
        assert!(matches!(first_choice("not json"), Err(LlmError::ResponseError(_))));
    }
}
