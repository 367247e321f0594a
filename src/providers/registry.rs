use std::sync::Arc;

use crate::config::types::ChorusConfig;
use crate::error::{ChorusError, Result};
use crate::providers::anthropic::AnthropicProvider;
use crate::providers::gemini::GeminiProvider;
use crate::providers::openai::OpenAIProvider;
use crate::providers::traits::{Credential, Provider};

pub fn create_provider(name: &str, config: &ChorusConfig) -> Result<Arc<dyn Provider>> {
    let provider_config =
        config
            .providers
            .get(name)
            .ok_or_else(|| ChorusError::ProviderNotFound {
                provider: name.to_string(),
            })?;

    // The key is looked up once here; a missing variable only surfaces when
    // the adapter is actually asked to respond.
    let credential = Credential::from_env(provider_config.api_key_env.as_str());
    let model = provider_config.default_model.clone();
    let base_url = provider_config.base_url.clone();
    let max_tokens = config.query.max_tokens;

    let provider: Arc<dyn Provider> = match name {
        "openai" => Arc::new(OpenAIProvider::new(credential, model, base_url, max_tokens)),
        "anthropic" => Arc::new(AnthropicProvider::new(
            credential, model, base_url, max_tokens,
        )),
        "gemini" => Arc::new(GeminiProvider::new(credential, model, base_url, max_tokens)),
        _ => {
            return Err(ChorusError::ProviderNotFound {
                provider: name.to_string(),
            });
        }
    };

    Ok(provider)
}

/// Build the full adapter roster in the order configured under `query.providers`.
pub fn build_roster(config: &ChorusConfig) -> Result<Vec<Arc<dyn Provider>>> {
    if config.query.providers.is_empty() {
        return Err(ChorusError::Config(
            "no providers configured under [query].providers".to_string(),
        ));
    }

    config
        .query
        .providers
        .iter()
        .map(|name| create_provider(name, config))
        .collect()
}
