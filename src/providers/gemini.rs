use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ChorusError, Result};
use crate::providers::traits::{Credential, Provider};

#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    credential: Credential,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl GeminiProvider {
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
            base_url: base_url
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn label(&self) -> &str {
        "Google (Gemini)"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn credential(&self) -> &Credential {
        &self.credential
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self.credential.get(self.name())?;

        // Gemini authenticates via a key query parameter rather than a header
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );

        let api_request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(self.max_tokens),
            }),
        };

        let response = self.client.post(&url).json(&api_request).send().await?;

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

        let api_response: GeminiResponse = response.json().await?;

        extract_text(api_response)
    }
}

/// Join the text parts of the first candidate.
fn extract_text(resp: GeminiResponse) -> Result<String> {
    let text = resp
        .candidates
        .into_iter()
        .next()
        .map(|c| {
            c.content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ChorusError::EmptyResponse {
            provider: "gemini".to_string(),
        });
    }

    Ok(text)
}

// Gemini API types

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}
