//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ConfigIssue};

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV_VAR: &str = "GRAND_CHALLENGE_AUTHORIZATION";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ConfigIssue>),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    from_toml_str(&content)
}

/// Parse and validate configuration from TOML text.
pub fn from_toml_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// The token environment variable, if set.
pub fn env_token() -> Option<String> {
    std::env::var(TOKEN_ENV_VAR).ok()
}

/// Fill in the token from the environment when the configuration leaves it unset.
pub fn apply_env_token(config: &mut ClientConfig, env_token: Option<String>) {
    if config.api.token.is_none() {
        config.api.token = env_token.filter(|t| !t.trim().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [api]
            token = "Bearer secret"

            [pagination]
            page_size = 25
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.pagination.page_size, 25);
        assert_eq!(config.api.authorization_header().as_deref(), Some("BEARER secret"));
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let err = from_toml_str("[uploads]\nconcurrency_bound = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(issues) => {
                assert_eq!(issues[0].field, "uploads.concurrency_bound")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            from_toml_str("[api\nbase_url = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_token_does_not_override_file() {
        let mut config = ClientConfig::default();
        config.api.token = Some("from-file".into());
        apply_env_token(&mut config, Some("from-env".into()));
        assert_eq!(config.api.token.as_deref(), Some("from-file"));

        let mut config = ClientConfig::default();
        apply_env_token(&mut config, Some("from-env".into()));
        assert_eq!(config.api.token.as_deref(), Some("from-env"));

        let mut config = ClientConfig::default();
        apply_env_token(&mut config, Some("   ".into()));
        assert_eq!(config.api.token, None);
    }
}
