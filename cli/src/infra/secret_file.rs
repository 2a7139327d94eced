//! Scoped owner-only temp files for key and auth material.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::application::ports::SecretFileWriter;

/// A temp file readable and writable by the owner only, deleted on drop.
#[derive(Debug)]
pub struct ScopedSecretFile {
    file: NamedTempFile,
}

impl ScopedSecretFile {
    /// Create the file with `contents` and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, restricted, or written.
    pub fn create(prefix: &str, contents: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .tempfile()
            .context("creating secret temp file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("restricting {}", file.path().display()))?;
        }

        let mut body = contents.to_string();
        if !body.ends_with('\n') {
            body.push('\n');
        }
        file.write_all(body.as_bytes())
            .and_then(|()| file.flush())
            .with_context(|| format!("writing {}", file.path().display()))?;
        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl AsRef<Path> for ScopedSecretFile {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Production [`SecretFileWriter`] for private keys.
pub struct TempKeyFiles;

impl SecretFileWriter for TempKeyFiles {
    type Guard = ScopedSecretFile;

    fn write_secret(&self, contents: &str) -> Result<ScopedSecretFile> {
        ScopedSecretFile::create("apricot-key-", contents)
    }
}
