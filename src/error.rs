use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChorusError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    // Provider errors
    #[error("Provider '{provider}' not found")]
    ProviderNotFound { provider: String },

    #[error("API key not found for provider '{provider}' (expected env: {env_var})")]
    ApiKeyMissing { provider: String, env_var: String },

    #[error("Provider API error: {message}")]
    ProviderApi {
        message: String,
        status: Option<u16>,
    },

    #[error("Rate limited by provider, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    #[error("Provider '{provider}' returned no text content")]
    EmptyResponse { provider: String },

    #[error("Provider timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Generic wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChorusError>;
