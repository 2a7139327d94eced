//! Domain types and validators for apricot configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "im.endpoint",
    "im.backend",
    "im.client",
    "token.endpoint",
    "token.client_id",
    "token.scope",
    "token.refresh_leeway",
    "timeouts.backend",
    "timeouts.remote",
    "catalog.path",
];
pub const VALID_BACKENDS: &[&str] = &["cli", "rest"];

const DEFAULT_IM_ENDPOINT: &str = "https://im.egi.eu/im";
const DEFAULT_IM_CLIENT: &str = "im_client.py";
const DEFAULT_TOKEN_ENDPOINT: &str =
    "https://aai.egi.eu/auth/realms/egi/protocol/openid-connect/token";
const DEFAULT_CLIENT_ID: &str = "token-portal";
const DEFAULT_SCOPE: &str = "openid email profile voperson_id eduperson_entitlement";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.apricot/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ApricotConfig {
    pub im: ImConfig,
    pub token: TokenConfig,
    pub timeouts: TimeoutConfig,
    pub catalog: CatalogConfig,
}

/// How the Infrastructure Manager is reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `im_client.py` subprocess.
    #[default]
    Cli,
    /// IM REST API.
    Rest,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cli => "cli",
            Self::Rest => "rest",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImConfig {
    pub endpoint: String,
    pub backend: BackendKind,
    /// Client executable, resolved via `PATH` when not absolute.
    pub client: String,
}

impl Default for ImConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_IM_ENDPOINT.to_string(),
            backend: BackendKind::Cli,
            client: DEFAULT_IM_CLIENT.to_string(),
        }
    }
}

/// OpenID Connect refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TokenConfig {
    pub endpoint: String,
    pub client_id: String,
    pub scope: String,
    /// Seconds before expiry at which a token is already refreshed.
    pub refresh_leeway: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            refresh_leeway: 60,
        }
    }
}

/// Subprocess and request timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub backend: u64,
    pub remote: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            backend: 120,
            remote: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog file. `None` means `~/.apricot/infrastructuresList.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApricotConfig {
    /// Apply an already validated `key = value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or value fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "im.endpoint" => self.im.endpoint = value.to_string(),
            "im.backend" => {
                self.im.backend = if value == "rest" {
                    BackendKind::Rest
                } else {
                    BackendKind::Cli
                };
            }
            "im.client" => self.im.client = value.to_string(),
            "token.endpoint" => self.token.endpoint = value.to_string(),
            "token.client_id" => self.token.client_id = value.to_string(),
            "token.scope" => self.token.scope = value.to_string(),
            "token.refresh_leeway" => self.token.refresh_leeway = value.parse()?,
            "timeouts.backend" => self.timeouts.backend = value.parse()?,
            "timeouts.remote" => self.timeouts.remote = value.parse()?,
            "catalog.path" => self.catalog.path = Some(value.to_string()),
            _ => anyhow::bail!("Unknown setting: {key}"),
        }
        Ok(())
    }

    /// Check every value as `set` would, for configs read from disk.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::InvalidValue` found.
    pub fn validate(&self) -> Result<()> {
        let explicit_catalog = self.catalog.path.is_some();
        for (key, value) in self.entries() {
            if key == "catalog.path" && !explicit_catalog {
                continue;
            }
            validate_config_value(key, &value)?;
        }
        Ok(())
    }

    /// Every setting as `(key, value)`, in whitelist order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("im.endpoint", self.im.endpoint.clone()),
            ("im.backend", self.im.backend.to_string()),
            ("im.client", self.im.client.clone()),
            ("token.endpoint", self.token.endpoint.clone()),
            ("token.client_id", self.token.client_id.clone()),
            ("token.scope", self.token.scope.clone()),
            ("token.refresh_leeway", self.token.refresh_leeway.to_string()),
            ("timeouts.backend", self.timeouts.backend.to_string()),
            ("timeouts.remote", self.timeouts.remote.to_string()),
            (
                "catalog.path",
                self.catalog.path.clone().unwrap_or_else(|| "(default)".to_string()),
            ),
        ]
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |valid: &str| -> anyhow::Error {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            valid: valid.to_string(),
        }
        .into()
    };
    match key {
        "im.backend" if !VALID_BACKENDS.contains(&value) => {
            Err(invalid(&VALID_BACKENDS.join(", ")))
        }
        "im.endpoint" | "token.endpoint"
            if !(value.starts_with("https://") || value.starts_with("http://")) =>
        {
            Err(invalid("an http:// or https:// URL"))
        }
        "token.refresh_leeway" if value.parse::<u64>().is_err() => {
            Err(invalid("a whole number of seconds"))
        }
        "timeouts.backend" | "timeouts.remote"
            if value.parse::<u64>().map_or(true, |secs| secs == 0) =>
        {
            Err(invalid("a positive whole number of seconds"))
        }
        "im.client" | "token.client_id" | "token.scope" | "catalog.path"
            if value.trim().is_empty() =>
        {
            Err(invalid("a non-empty string"))
        }
        _ => Ok(()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
