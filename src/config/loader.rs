use std::path::{Path, PathBuf};

use crate::config::types::ChorusConfig;
use crate::error::{ChorusError, Result};

/// Get the default configuration file path
pub fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "chorus", "chorus") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        // Fallback to home directory
        dirs_fallback().join(".chorus").join("config.toml")
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(config_path: Option<&Path>) -> Result<ChorusConfig> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    if !path.exists() {
        // Return defaults if no config file exists
        return Ok(ChorusConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config: ChorusConfig =
        toml::from_str(&content).map_err(|e| ChorusError::TomlParse(e.to_string()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.query.providers.len(), 3);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [query]
            providers = ["anthropic"]

            [providers.anthropic]
            api_key_env = "MY_CLAUDE_KEY"
            default_model = "claude-3-haiku-20240307"
            "#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.query.providers, ["anthropic"]);
        assert_eq!(config.providers["anthropic"].api_key_env, "MY_CLAUDE_KEY");
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[query").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ChorusError::TomlParse(_)));
    }
}
