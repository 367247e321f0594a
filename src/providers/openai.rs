use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ChorusError, Result};
use crate::providers::traits::{Credential, Provider};

#[derive(Debug)]
pub struct OpenAIProvider {
    client: Client,
    credential: Credential,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl OpenAIProvider {
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
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn label(&self) -> &str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn credential(&self) -> &Credential {
        &self.credential
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self.credential.get(self.name())?;
        let url = format!("{}/v1/chat/completions", self.base_url);

        let api_request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: Some(self.max_tokens),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
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

        let api_response: OpenAIResponse = response.json().await?;

        extract_text(api_response)
    }
}

/// Pull the assistant text out of the first choice.
fn extract_text(resp: OpenAIResponse) -> Result<String> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ChorusError::EmptyResponse {
            provider: "openai".to_string(),
        })
}

// OpenAI API types

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let request = OpenAIRequest {
            model: "gpt-4o".to_string(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: "2+2?".to_string(),
            }],
            max_tokens: Some(2048),
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "2+2?");
        assert_eq!(body["max_tokens"], 2048);
    }

    #[test]
    fn extracts_first_choice_text() {
        let resp: OpenAIResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"4"}}],
                "usage":{"prompt_tokens":5,"completion_tokens":1}}"#,
        )
        .unwrap();

        assert_eq!(extract_text(resp).unwrap(), "4");
    }

    #[test]
    fn empty_choices_is_shape_error() {
        let resp: OpenAIResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_text(resp),
            Err(ChorusError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn null_content_is_shape_error() {
        let resp: OpenAIResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(
            extract_text(resp),
            Err(ChorusError::EmptyResponse { .. })
        ));
    }
}
