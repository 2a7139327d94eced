//! Infrastructure implementation of the `CatalogStore` port.
//!
//! Writes are optimistic transactions: the bytes read at the start are
//! hashed, and the commit is refused if the file no longer hashes the same
//! right before the atomic rename.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use apricot_common::CatalogDocument;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::application::ports::CatalogStore;
use crate::domain::config::ApricotConfig;
use crate::domain::error::RegistryError;
use crate::infra::config::apricot_dir;

/// Environment variable that overrides the catalog location.
pub const CATALOG_ENV: &str = "APRICOT_CATALOG";

/// Catalog stored as a JSON document on disk.
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    /// Catalog at `$APRICOT_CATALOG`, else `catalog.path` from the config,
    /// else `~/.apricot/infrastructuresList.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new(config: &ApricotConfig) -> Result<Self> {
        if let Ok(val) = std::env::var(CATALOG_ENV) {
            return Ok(Self::with_path(PathBuf::from(val)));
        }
        if let Some(path) = &config.catalog.path {
            return Ok(Self::with_path(PathBuf::from(path)));
        }
        Ok(Self::with_path(
            apricot_dir()?.join("infrastructuresList.json"),
        ))
    }

    /// Catalog at an explicit path (used in tests).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("reading catalog {}", self.path.display())),
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<CatalogDocument> {
        CatalogDocument::from_slice(bytes).map_err(|e| {
            RegistryError::CorruptCatalog {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn commit(&self, bytes: &[u8]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp.path().display()))?;
        }

        temp.write_all(bytes)
            .and_then(|()| temp.as_file().sync_all())
            .with_context(|| format!("writing temp file {}", temp.path().display()))?;
        temp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("finalizing catalog {}", self.path.display()))?;
        Ok(())
    }
}

impl CatalogStore for JsonCatalog {
    fn load(&self) -> Result<CatalogDocument> {
        let bytes = self.read_bytes()?;
        self.parse(&bytes)
    }

    fn update<F>(&self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut CatalogDocument) -> Result<bool>,
    {
        let original = self.read_bytes()?;
        let digest = Sha256::digest(&original);
        let mut document = self.parse(&original)?;

        if !mutate(&mut document)? {
            debug!(path = %self.path.display(), "catalog unchanged, not rewritten");
            return Ok(false);
        }
        let serialized = document
            .to_pretty_json()
            .context("serializing catalog")?;

        if Sha256::digest(self.read_bytes()?) != digest {
            return Err(RegistryError::Conflict {
                path: self.path.display().to_string(),
            }
            .into());
        }
        self.commit(&serialized)?;
        debug!(path = %self.path.display(), entries = document.infrastructures.len(), "catalog written");
        Ok(true)
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}
