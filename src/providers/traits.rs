use async_trait::async_trait;

use crate::error::{ChorusError, Result};

/// A credential resolved from the environment at startup.
///
/// A missing variable is not an error until the key is actually needed, so
/// one unconfigured provider degrades to a per-round failure instead of
/// blocking the whole process.
#[derive(Debug, Clone)]
pub struct Credential {
    env_var: String,
    value: Option<String>,
}

impl Credential {
    pub fn from_env(env_var: impl Into<String>) -> Self {
        let env_var = env_var.into();
        let value = std::env::var(&env_var).ok().filter(|v| !v.is_empty());
        Self { env_var, value }
    }

    #[cfg(test)]
    pub fn fixed(env_var: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            value: Some(value.into()),
        }
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Resolve the key, or fail with the provider name in the message.
    pub fn get(&self, provider: &str) -> Result<&str> {
        self.value
            .as_deref()
            .ok_or_else(|| ChorusError::ApiKeyMissing {
                provider: provider.to_string(),
                env_var: self.env_var.clone(),
            })
    }
}

#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Provider name identifier, stable for the process lifetime
    fn name(&self) -> &str;

    /// Human-readable label used in rendered output
    fn label(&self) -> &str;

    /// Model identifier this adapter sends requests with
    fn model(&self) -> &str;

    /// The credential this adapter authenticates with
    fn credential(&self) -> &Credential;

    /// Send a single prompt and return the response text
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_defers_to_first_use() {
        let cred = Credential {
            env_var: "CHORUS_TEST_UNSET_KEY".to_string(),
            value: None,
        };
        assert!(!cred.is_set());

        let err = cred.get("openai").unwrap_err();
        assert!(matches!(err, ChorusError::ApiKeyMissing { .. }));
        assert!(err.to_string().contains("CHORUS_TEST_UNSET_KEY"));
    }

    #[test]
    fn set_credential_resolves() {
        let cred = Credential::fixed("X_KEY", "sk-test");
        assert!(cred.is_set());
        assert_eq!(cred.get("openai").unwrap(), "sk-test");
    }
}
