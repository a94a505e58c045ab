//! Application configuration.
//!
//! A single TOML file carries the database location and the credential
//! pool. Everything here is validated at load time; configuration errors
//! never survive into the request path.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::auth::{Credential, CredentialPool};

/// Configuration and validation errors. All of these are raised
/// synchronously, before any I/O against the provider or the database.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported interval '{0}' (expected '1min' or '1day')")]
    InvalidInterval(String),

    #[error("invalid symbol part '{0}'")]
    InvalidSymbol(String),

    #[error("unknown credential tier '{0}' (expected 'direct' or 'rapid')")]
    InvalidTier(String),

    #[error("credential pool is empty")]
    EmptyPool,

    #[error("duplicate credential name '{0}'")]
    DuplicateCredential(String),

    #[error("empty credential selection — did you forget to choose a pool?")]
    EmptyKeySelection,

    #[error("credential '{0}' is not in the configured pool")]
    UnknownCredential(String),

    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// One credential as written in the config file. The tier string is
/// resolved into [`crate::auth::ApiTier`] during pool construction.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    pub name: String,
    pub tier: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub credentials: Vec<CredentialEntry>,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve the configured credentials into a validated pool. Tier
    /// strings are parsed here, once, so nothing downstream ever inspects
    /// them again.
    pub fn credential_pool(&self) -> Result<CredentialPool, ConfigError> {
        let credentials = self
            .credentials
            .iter()
            .map(|entry| {
                let tier = entry.tier.parse()?;
                Ok(Credential::new(entry.name.clone(), tier, entry.token.clone()))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        CredentialPool::new(credentials)
    }
}
