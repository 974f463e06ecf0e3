// src/config/llm.rs
use serde::Deserialize;
use std::env;

use super::ConfigError;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Only "openai" is wired up (case-insensitive).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Resolve the credential. A missing or blank key is fatal.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        let provider = self.provider.trim().to_ascii_lowercase();
        if provider != "openai" {
            return Err(ConfigError::UnsupportedProvider(self.provider.clone()));
        }

        let key = if self.api_key.trim().eq_ignore_ascii_case("env") {
            env::var(OPENAI_API_KEY).unwrap_or_default()
        } else {
            self.api_key.clone()
        };

        if key.trim().is_empty() {
            return Err(ConfigError::MissingCredential(OPENAI_API_KEY));
        }
        Ok(key.trim().to_string())
    }
}
