//! Tunables for a checking session, loadable from JSON.

use serde::{Deserialize, Serialize};

pub use self::error::ConfigError;
mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum ConfigError {
        #[error("Invalid checker configuration: {0}")]
        Json(#[from] serde_json::Error),
        #[error("max_index must be positive, got {0}")]
        InvalidMaxIndex(i64),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Largest index accepted in indexed value and template lists.
    pub max_index: i64,
    pub warn_any_or_omit_in_subset: bool,
    pub warn_any_or_omit_in_mandatory_field: bool,
    /// Emit a `debug!` event for every top-level compatibility query.
    pub log_compatibility_queries: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_index: i32::MAX as i64,
            warn_any_or_omit_in_subset: true,
            warn_any_or_omit_in_mandatory_field: true,
            log_compatibility_queries: false,
        }
    }
}

impl CheckerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: CheckerConfig = serde_json::from_str(text)?;
        if config.max_index <= 0 {
            return Err(ConfigError::InvalidMaxIndex(config.max_index));
        }
        Ok(config)
    }
}
