//! YAML-backed `ConfigStore` and the `~/.apricot` directory it lives in.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::ApricotConfig;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "APRICOT_CONFIG";

/// `~/.apricot`: config file and default catalog.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn apricot_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".apricot"))
}

/// Config file at `$APRICOT_CONFIG`, else `~/.apricot/config.yaml`.
pub struct YamlConfigStore;

/// Parse a config file body. Hand-edited values go through the same checks
/// as `apricot config set`.
fn parse(content: &str, path: &Path) -> Result<ApricotConfig> {
    if content.trim().is_empty() {
        return Ok(ApricotConfig::default());
    }
    let config: ApricotConfig = serde_yaml::from_str(content)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid setting in {}", path.display()))?;
    Ok(config)
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ApricotConfig> {
        let path = self.path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => parse(&content, &path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ApricotConfig::default()),
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    fn save(&self, config: &ApricotConfig) -> Result<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", path.display()))?;
        }
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        match std::env::var_os(CONFIG_ENV) {
            Some(val) if !val.is_empty() => Ok(PathBuf::from(val)),
            _ => Ok(apricot_dir()?.join("config.yaml")),
        }
    }
}
