//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MP_CART_STORAGE_DIR` - Directory for the file-backed store (default: .marketplace)
//! - `MP_CART_STORAGE_KEY` - Key the cart record is stored under (default: @GoMarketplace:products)
//! - `MP_CART_COMMAND_BUFFER` - Pending command capacity of the store (default: 32)

use std::path::PathBuf;

use thiserror::Error;

use crate::snapshot::DEFAULT_STORAGE_KEY;

const DEFAULT_STORAGE_DIR: &str = ".marketplace";
const DEFAULT_COMMAND_BUFFER: usize = 32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Directory holding the persisted record when using `FileStore`
    pub storage_dir: PathBuf,
    /// Key the cart record is stored under
    pub storage_key: String,
    /// How many commands may wait for the store before senders back off
    pub command_buffer: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage_dir = PathBuf::from(get_or_default(&lookup, "MP_CART_STORAGE_DIR", DEFAULT_STORAGE_DIR));
        let storage_key = get_or_default(&lookup, "MP_CART_STORAGE_KEY", DEFAULT_STORAGE_KEY);
        if storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "MP_CART_STORAGE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let command_buffer = get_or_default(
            &lookup,
            "MP_CART_COMMAND_BUFFER",
            &DEFAULT_COMMAND_BUFFER.to_string(),
        )
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidEnvVar("MP_CART_COMMAND_BUFFER".to_string(), e.to_string()))?;
        if command_buffer == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MP_CART_COMMAND_BUFFER".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            storage_dir,
            storage_key,
            command_buffer,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CartConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CartConfig::default());
        assert_eq!(config.storage_key, "@GoMarketplace:products");
        assert_eq!(config.command_buffer, 32);
    }

    #[test]
    fn test_overrides() {
        let config = CartConfig::from_lookup(lookup_from(&[
            ("MP_CART_STORAGE_DIR", "/var/lib/cart"),
            ("MP_CART_STORAGE_KEY", "@Test:cart"),
            ("MP_CART_COMMAND_BUFFER", "4"),
        ]))
        .unwrap();

        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/cart"));
        assert_eq!(config.storage_key, "@Test:cart");
        assert_eq!(config.command_buffer, 4);
    }

    #[test]
    fn test_invalid_buffer() {
        let result = CartConfig::from_lookup(lookup_from(&[("MP_CART_COMMAND_BUFFER", "lots")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(ref name, _)) if name == "MP_CART_COMMAND_BUFFER"));

        let result = CartConfig::from_lookup(lookup_from(&[("MP_CART_COMMAND_BUFFER", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = CartConfig::from_lookup(lookup_from(&[("MP_CART_STORAGE_KEY", "  ")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }
}
