pub mod gemini;
pub mod ollama;
pub mod remote;

use crate::llm::LlmError;
use std::time::Duration;

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LlmError::ConnectionError(e.to_string()))
}

/// Reads a response body, turning non-2xx statuses into `ResponseError`.
pub(crate) async fn read_body(
    provider: &str,
    response: reqwest::Response,
) -> Result<String, LlmError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        tracing::error!("{} API responded with status code: {} - {}", provider, status, body);
        return Err(LlmError::ResponseError(format!(
            "{} API responded with status code: {} - Response body: {}",
            provider, status, body
        )));
    }

    Ok(body)
}
