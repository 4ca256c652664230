//! Configuration loading for the Solace service.
//!
//! Reads a single json5 config file, applies schema defaults, validates
//! field constraints, and applies environment overrides for secrets.

mod error;
mod model;

pub use error::ConfigError;
pub use model::{
    CompletionConfig, ConversationConfig, FollowUpConfig, ServerConfig, SolaceConfig,
    SolaceConfigBuilder,
};

use log::{debug, info};
use std::fs;
use std::path::Path;

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "SOLACE_API_KEY";

/// Load config from a json5 file, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SolaceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            let value: serde_json::Value = json5::from_str(&raw)?;
            let config: SolaceConfig = serde_json::from_value(value)?;
            info!("loaded config (path={})", path.display());
            config
        }
        None => {
            debug!("no config path given, using defaults");
            SolaceConfig::default()
        }
    };

    if let Ok(key) = std::env::var(API_KEY_ENV)
        && !key.trim().is_empty()
    {
        debug!("api key overridden from environment");
        config.completion.api_key = Some(key.trim().to_string());
    }

    validate(&config)?;
    Ok(config)
}

/// Validate field constraints that serde defaults cannot express.
fn validate(config: &SolaceConfig) -> Result<(), ConfigError> {
    if config.conversation.history_cap == 0 {
        return Err(ConfigError::InvalidField {
            path: "conversation.history_cap".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    if config.conversation.replay_len > config.conversation.history_cap {
        return Err(ConfigError::InvalidField {
            path: "conversation.replay_len".to_string(),
            message: "cannot exceed conversation.history_cap".to_string(),
        });
    }
    if config.completion.timeout_secs == 0 {
        return Err(ConfigError::InvalidField {
            path: "completion.timeout_secs".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, load_config};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = load_config(None).expect("defaults");
        assert_eq!(config.conversation.history_cap, 50);
        assert_eq!(config.conversation.replay_len, 20);
        assert_eq!(config.follow_up.delay_minutes, 30);
        assert_eq!(config.completion.api_base, None);
    }

    #[test]
    fn json5_file_overrides_defaults() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{
                // local test server
                server: {{ bind: "0.0.0.0:9000" }},
                completion: {{ api_base: "http://localhost:11434/v1", model: "llama3" }},
            }}"#
        )
        .expect("write");

        let config = load_config(Some(file.path())).expect("load");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(
            config.completion.api_base.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.completion.model, "llama3");
        assert_eq!(config.conversation.history_cap, 50);
    }

    #[test]
    fn replay_len_cannot_exceed_history_cap() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{ conversation: {{ history_cap: 10, replay_len: 20 }} }}"#
        )
        .expect("write");

        let err = load_config(Some(file.path())).expect_err("invalid");
        match err {
            ConfigError::InvalidField { path, .. } => {
                assert_eq!(path, "conversation.replay_len");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
