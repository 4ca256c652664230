//! Configuration schema for the Solace service.

use serde::{Deserialize, Serialize};

/// Root config for the Solace service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SolaceConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub follow_up: FollowUpConfig,
}

impl SolaceConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> SolaceConfigBuilder {
        SolaceConfigBuilder::new()
    }
}

/// Builder for assembling a `SolaceConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct SolaceConfigBuilder {
    config: SolaceConfig,
}

impl SolaceConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: SolaceConfig::default(),
        }
    }

    /// Replace the server configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Replace the completion-service configuration.
    pub fn completion(mut self, completion: CompletionConfig) -> Self {
        self.config.completion = completion;
        self
    }

    /// Replace the conversation configuration.
    pub fn conversation(mut self, conversation: ConversationConfig) -> Self {
        self.config.conversation = conversation;
        self
    }

    /// Replace the follow-up configuration.
    pub fn follow_up(mut self, follow_up: FollowUpConfig) -> Self {
        self.config.follow_up = follow_up;
        self
    }

    /// Finish building and return the config.
    pub fn build(self) -> SolaceConfig {
        self.config
    }
}

/// Listener settings for the realtime endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the WebSocket server.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// External completion/vision service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the OpenAI-compatible API; absent means fallback-only.
    #[serde(default)]
    pub api_base: Option<String>,
    /// API key; overridden by `SOLACE_API_KEY` when set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used for chat replies.
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used for image mood classification.
    #[serde(default)]
    pub vision_model: Option<String>,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key: None,
            model: default_model(),
            vision_model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// In-memory conversation window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Per-elder message cap before FIFO eviction.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Messages replayed to the elder on rejoin.
    #[serde(default = "default_replay_len")]
    pub replay_len: usize,
    /// Lookahead window for upcoming routines, in minutes.
    #[serde(default = "default_routine_lookahead")]
    pub routine_lookahead_minutes: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            replay_len: default_replay_len(),
            routine_lookahead_minutes: default_routine_lookahead(),
        }
    }
}

/// Proactive follow-up settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpConfig {
    /// Default delay before a concern follow-up fires, in minutes.
    #[serde(default = "default_follow_up_delay")]
    pub delay_minutes: u32,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            delay_minutes: default_follow_up_delay(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8321".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_history_cap() -> usize {
    50
}

fn default_replay_len() -> usize {
    20
}

fn default_routine_lookahead() -> u32 {
    30
}

fn default_follow_up_delay() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::{CompletionConfig, FollowUpConfig, SolaceConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_replaces_sections_and_keeps_the_rest_default() {
        let config = SolaceConfig::builder()
            .completion(CompletionConfig {
                model: "llama3".to_string(),
                ..CompletionConfig::default()
            })
            .follow_up(FollowUpConfig { delay_minutes: 5 })
            .build();

        assert_eq!(config.completion.model, "llama3");
        assert_eq!(config.follow_up.delay_minutes, 5);
        assert_eq!(config.conversation.history_cap, 50);
        assert_eq!(config.server.bind, "127.0.0.1:8321");
    }
}
