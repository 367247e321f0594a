use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChorusConfig {
    pub query: QueryConfig,
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for ChorusConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            providers: default_providers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Providers to fan a prompt out to, in display order
    pub providers: Vec<String>,
    /// Per-provider deadline in seconds; 0 disables the deadline
    pub timeout_seconds: u64,
    /// Response length cap passed to each provider
    pub max_tokens: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                "openai".to_string(),
                "anthropic".to_string(),
                "gemini".to_string(),
            ],
            timeout_seconds: 120,
            max_tokens: 2048,
        }
    }
}

/// Configuration for a single provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Model requested when querying this provider
    pub default_model: String,
    /// API endpoint override
    pub base_url: Option<String>,
}

fn default_providers() -> HashMap<String, ProviderConfig> {
    let mut providers = HashMap::new();

    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            api_key_env: "OPENAI_API_KEY".to_string(),
            default_model: "gpt-4o".to_string(),
            base_url: None,
        },
    );

    providers.insert(
        "anthropic".to_string(),
        ProviderConfig {
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            default_model: "claude-3-opus-20240229".to_string(),
            base_url: None,
        },
    );

    providers.insert(
        "gemini".to_string(),
        ProviderConfig {
            api_key_env: "GOOGLE_API_KEY".to_string(),
            default_model: "gemini-1.5-pro-latest".to_string(),
            base_url: None,
        },
    );

    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roster_covers_three_providers() {
        let config = ChorusConfig::default();
        assert_eq!(config.query.providers, ["openai", "anthropic", "gemini"]);
        for name in &config.query.providers {
            assert!(config.providers.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn defaults_match_known_env_vars() {
        let config = ChorusConfig::default();
        assert_eq!(config.providers["openai"].api_key_env, "OPENAI_API_KEY");
        assert_eq!(
            config.providers["anthropic"].api_key_env,
            "ANTHROPIC_API_KEY"
        );
        assert_eq!(config.providers["gemini"].api_key_env, "GOOGLE_API_KEY");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: ChorusConfig = toml::from_str(
            r#"
            [query]
            timeout_seconds = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.query.timeout_seconds, 30);
        assert_eq!(config.query.max_tokens, 2048);
        assert_eq!(config.query.providers.len(), 3);
        assert!(config.providers.contains_key("gemini"));
    }
}
