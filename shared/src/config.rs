use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{KeyNamespace, MAX_PREFIX_LENGTH};
use crate::model::Screen;
use crate::{DEFAULT_STORAGE_PREFIX, MAX_TEXT_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid storage prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: String },
    #[error("max_text_length must be > 0")]
    ZeroTextLength,
    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prepended to every storage key.
    pub storage_prefix: String,
    /// Where a fresh or reset session starts.
    pub initial_screen: Screen,
    /// Character cap for journal text.
    pub max_text_length: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            initial_screen: Screen::Welcome,
            max_text_length: MAX_TEXT_LENGTH,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.namespace()?;
        if self.max_text_length == 0 {
            return Err(ConfigError::ZeroTextLength);
        }
        Ok(())
    }

    pub fn namespace(&self) -> Result<KeyNamespace, ConfigError> {
        KeyNamespace::new(self.storage_prefix.clone()).map_err(|_| ConfigError::InvalidPrefix {
            prefix: self.storage_prefix.clone(),
            reason: format!(
                "expected at most {MAX_PREFIX_LENGTH} ASCII alphanumeric, '_' or '-' characters"
            ),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
