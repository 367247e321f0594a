use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ChorusError, Result};
use crate::providers::traits::{Credential, Provider};

#[derive(Debug)]
pub struct AnthropicProvider {
    client: Client,
    credential: Credential,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        credential: Credential,
        model: String,
        base_url: Option<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client: Client::new(),
            credential,
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com".to_string()),
            max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn label(&self) -> &str {
        "Anthropic (Claude)"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn credential(&self) -> &Credential {
        &self.credential
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self.credential.get(self.name())?;
        let url = format!("{}/v1/messages", self.base_url);

        let api_request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ChorusError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChorusError::ProviderApi {
                message: error_text,
                status: Some(status.as_u16()),
            });
        }

        let api_response: AnthropicResponse = response.json().await?;

        extract_text(api_response)
    }
}

/// Pull the first text block out of the response content.
fn extract_text(resp: AnthropicResponse) -> Result<String> {
    resp.content
        .into_iter()
        .find_map(|block| match block {
            AnthropicContentBlock::Text { text } if !text.is_empty() => Some(text),
            AnthropicContentBlock::Text { .. } => None,
        })
        .ok_or_else(|| ChorusError::EmptyResponse {
            provider: "anthropic".to_string(),
        })
}

// Anthropic API types

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
}
