//! Anthropic Messages API generator
//!
//! Sends the composed prompt as a single user message with the directive
//! system prompt, retrying transient failures with exponential backoff.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{GenerateError, Generator, SYSTEM_PROMPT};
use crate::config::GeneratorConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Generator backed by Anthropic's Messages API
pub struct AnthropicGenerator {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl AnthropicGenerator {
    /// Create a new generator from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|_| GenerateError::MissingApiKey(config.api_key_env.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(GenerateError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the Messages API
    fn build_request_body(&self, input: &str, max_tokens: Option<u32>) -> serde_json::Value {
        let max_tokens = max_tokens.map_or(self.max_tokens, |m| m.min(self.max_tokens));
        serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": input }],
        })
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn generate(&self, input: &str, max_tokens: Option<u32>) -> Result<String, GenerateError> {
        debug!(%self.model, input_len = input.len(), "generate: called");
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_request_body(input, max_tokens);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "generate: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let result = match self
                .http
                .post(url.clone())
                .header("x-api-key", self.api_key.clone())
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(response) => read_response(response).await,
                Err(e) => Err(GenerateError::Network(e)),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    debug!(attempt, error = %e, "generate: transient error");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| GenerateError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

/// Map one HTTP response to generated text or an error
async fn read_response(response: reqwest::Response) -> Result<String, GenerateError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);

        return Err(GenerateError::RateLimited {
            retry_after: Duration::from_secs(retry_after),
        });
    }

    if !response.status().is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GenerateError::ApiError { status, message });
    }

    let text = response.text().await?;
    let api_response: AnthropicResponse = serde_json::from_str(&text)?;
    debug!(stop_reason = ?api_response.stop_reason, "read_response: success");
    collect_text(api_response)
}

fn collect_text(response: AnthropicResponse) -> Result<String, GenerateError> {
    let texts: Vec<String> = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .collect();

    if texts.is_empty() {
        return Err(GenerateError::InvalidResponse("Response contained no text".to_string()));
    }
    Ok(texts.join(""))
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}
