//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::ApricotConfig;

/// Load configuration.
///
/// # Errors
///
/// Propagates store errors.
pub fn load_config(store: &impl ConfigStore) -> Result<ApricotConfig> {
    store.load()
}

/// Validate and apply `key = value`, then persist.
///
/// # Errors
///
/// Returns `ConfigError::UnknownKey` / `ConfigError::InvalidValue`, or a
/// store error. The stored file is untouched when validation fails.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<ApricotConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    store.save(&config)?;
    Ok(config)
}
