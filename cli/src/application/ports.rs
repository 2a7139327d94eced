//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared catalog types,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use apricot_common::{CatalogDocument, CatalogEntry};

use crate::domain::config::ApricotConfig;
use crate::domain::credential::AuthContext;
use crate::domain::error::RegistryError;
use crate::domain::extract::VmRecord;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Infrastructure Manager Port ───────────────────────────────────────────────

/// Narrow client of the Infrastructure Manager.
///
/// Implementations translate whatever the IM answers into [`VmRecord`]s, so
/// nothing above this trait sees provider-specific text.
#[allow(async_fn_in_trait)]
pub trait InfrastructureBackend {
    /// Records of one VM.
    async fn vm_info(&self, auth: &AuthContext, inf_id: &str, vm_id: &str)
    -> Result<Vec<VmRecord>>;
    /// Records of every VM of an infrastructure, in IM order.
    async fn infrastructure_info(&self, auth: &AuthContext, inf_id: &str) -> Result<Vec<VmRecord>>;
    /// Aggregated infrastructure state (`running`, `configured`, ...).
    async fn state(&self, auth: &AuthContext, inf_id: &str) -> Result<String>;
    /// Contextualization log.
    async fn contmsg(&self, auth: &AuthContext, inf_id: &str) -> Result<String>;
    /// Destroy the infrastructure; returns the IM's confirmation text.
    async fn destroy(&self, auth: &AuthContext, inf_id: &str) -> Result<String>;
    /// Deploy `template`; returns the new infrastructure ID.
    async fn create(&self, auth: &AuthContext, template: &Path) -> Result<String>;
}

// ── Token Endpoint Port ───────────────────────────────────────────────────────

/// OpenID Connect token endpoint.
#[allow(async_fn_in_trait)]
pub trait TokenEndpoint {
    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RefreshFailed` on a non-success status or a
    /// response without `access_token`.
    async fn exchange(&self, refresh_token: &str) -> Result<String>;
}

// ── Catalog Port ──────────────────────────────────────────────────────────────

/// The infrastructure catalog.
///
/// Every write goes through [`update`](Self::update), a whole-document
/// read-modify-write transaction.
pub trait CatalogStore {
    /// Load the whole document. A missing catalog is an empty document.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::CorruptCatalog` if the content cannot be parsed.
    fn load(&self) -> Result<CatalogDocument>;

    /// Apply `mutate` to the current document and commit it if `mutate`
    /// returns `true`. Returns whether the document was written.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Conflict` if the document changed between the
    /// read and the commit, or any error raised by `mutate`.
    fn update<F>(&self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut CatalogDocument) -> Result<bool>;

    /// Where the catalog lives, for messages.
    fn location(&self) -> PathBuf;

    /// Entry of `inf_id` with shared tokens filled in.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for an unknown ID.
    fn get(&self, inf_id: &str) -> Result<CatalogEntry> {
        self.load()?
            .effective_entry(inf_id)
            .ok_or_else(|| RegistryError::NotFound(inf_id.to_string()).into())
    }

    /// Insert or replace an entry.
    ///
    /// # Errors
    ///
    /// Propagates transaction errors.
    fn upsert(&self, entry: CatalogEntry) -> Result<()> {
        self.update(|doc| {
            doc.upsert(entry);
            Ok(true)
        })?;
        Ok(())
    }

    /// Remove an entry. Unknown IDs are a no-op that leaves the file untouched.
    ///
    /// # Errors
    ///
    /// Propagates transaction errors.
    fn remove(&self, inf_id: &str) -> Result<bool> {
        self.update(|doc| Ok(doc.remove(inf_id).is_some()))
    }

    /// Write a refreshed access token back to the slot it was read from.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for an unknown ID.
    fn set_access_token(&self, inf_id: &str, token: &str) -> Result<()> {
        self.update(|doc| {
            if doc.set_access_token(inf_id, token) {
                Ok(true)
            } else {
                Err(RegistryError::NotFound(inf_id.to_string()).into())
            }
        })?;
        Ok(())
    }
}

// ── Secret File Port ──────────────────────────────────────────────────────────

/// Writes secret material to an owner-only file.
///
/// The file lives exactly as long as the returned guard.
pub trait SecretFileWriter {
    type Guard: AsRef<Path>;

    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    fn write_secret(&self, contents: &str) -> Result<Self::Guard>;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<ApricotConfig>;
    /// Persist the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, config: &ApricotConfig) -> Result<()>;
    /// Path of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}
