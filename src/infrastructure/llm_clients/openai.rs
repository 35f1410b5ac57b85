use super::CompletionClient;
use crate::domain::completion::{Completion, CompletionError, CompletionResult};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::prompt::PromptPair;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Client for any OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAIClient {
    client: reqwest::Client,
    config: LLMConfig,
}

impl OpenAIClient {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        if self.config.base_url.ends_with('/') {
            format!("{}chat/completions", self.config.base_url)
        } else {
            format!("{}/chat/completions", self.config.base_url)
        }
    }

    fn build_body(&self, prompt: &PromptPair) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system_context {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt.instruction }));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
        });
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

/// Maps a non-success HTTP status to a failure class.
pub(crate) fn classify_status(status: StatusCode) -> CompletionError {
    let message = format!("API error ({})", status);
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        CompletionError::transient(message)
    } else {
        CompletionError::fatal(message)
    }
}

fn classify_send_error(err: &reqwest::Error) -> CompletionError {
    if err.is_builder() {
        CompletionError::fatal(format!("Invalid request: {}", err))
    } else if err.is_timeout() {
        CompletionError::transient(format!("Request timed out: {}", err))
    } else {
        CompletionError::transient(format!("Request failed: {}", err))
    }
}

pub(crate) fn parse_completion(json: &serde_json::Value) -> CompletionResult {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|text| Completion {
            text: text.to_string(),
        })
        .ok_or_else(|| CompletionError::transient("Invalid response format"))
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, prompt: &PromptPair) -> CompletionResult {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| CompletionError::fatal("Missing API key for completion service"))?;

        let url = self.endpoint();
        debug!(url = %url, model = %self.config.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.build_body(prompt))
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let mut err = classify_status(status);
            err.message = format!("{}: {}", err.message, text);
            return Err(err);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::transient(format!("Failed to parse JSON: {}", e)))?;

        parse_completion(&json)
    }
}
