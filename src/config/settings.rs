//! Application settings loaded from `config.toml`.
//!
//! Every section has defaults, so a missing file yields a working local
//! configuration. Secrets (the identity-provider service key) are never part
//! of this file; they are read from the environment right before use.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Identity provider settings
    pub identity: IdentityConfig,
    /// Action link settings
    pub links: LinksConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the privileged-function server binds to
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8787".to_string(),
        }
    }
}

/// Identity provider settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base URL of the hosted backend (identity API lives under `/auth/v1`)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:54321".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Action link settings
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinksConfig {
    /// Where invite and recovery links send the user after verification
    pub redirect_to: Option<String>,
}

/// Environment variable holding the identity-provider service key.
pub const SERVICE_ROLE_KEY_VAR: &str = "IDENTITY_SERVICE_ROLE_KEY";

/// Loads configuration from a TOML file.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| {
        Error::Config(format!("Failed to read config file {path_ref:?}: {e}"))
    })?;

    toml::from_str(&contents).map_err(|e| {
        Error::Config(format!(
            "Failed to parse TOML from config file {path_ref:?}: {e}"
        ))
    })
}

/// Loads `./config.toml`, falling back to defaults when the file is absent.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        info!("No config.toml found, using default configuration.");
        Ok(AppConfig::default())
    }
}
