//! Engine defaults
//!
//! Loaded from `.use-methods.toml`:
//!
//! ```toml
//! enable_loading = true
//! strict_context = true
//! log_actions = false
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MethodsConfig {
    /// Track a loading flag per declared action
    #[serde(default)]
    pub enable_loading: bool,

    /// Fail when a context is used outside of its provider
    #[serde(default = "default_strict_context")]
    pub strict_context: bool,

    /// Install the logging middleware
    #[serde(default)]
    pub log_actions: bool,
}

fn default_strict_context() -> bool {
    true
}

impl Default for MethodsConfig {
    fn default() -> Self {
        Self {
            enable_loading: false,
            strict_context: default_strict_context(),
            log_actions: false,
        }
    }
}

impl MethodsConfig {
    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        if let Some(content) = crate::load_config_file() {
            match Self::from_toml_str(&content) {
                Ok(config) => {
                    log::info!("Loaded use-methods config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {:#}", e);
                }
            }
        }

        log::debug!("Using default use-methods config");
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Invalid use-methods configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MethodsConfig::default();
        assert!(!config.enable_loading);
        assert!(config.strict_context);
        assert!(!config.log_actions);
    }

    #[test]
    fn test_config_deserialize() {
        let config = MethodsConfig::from_toml_str("enable_loading = true").unwrap();
        assert!(config.enable_loading);
        // untouched fields keep their defaults
        assert!(config.strict_context);
        assert!(!config.log_actions);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(MethodsConfig::from_toml_str("").unwrap(), MethodsConfig::default());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let err = MethodsConfig::from_toml_str("enable_loading = \"yes\"").unwrap_err();
        assert!(err.to_string().contains("Invalid use-methods configuration"));
    }
}
