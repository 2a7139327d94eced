//! ssh/scp invocations against a VM.
//!
//! Pure argument construction. The key file path is supplied by the caller,
//! which owns its lifetime.

use std::path::Path;

use crate::domain::error::{AccessError, Secret};

/// Where a remote operation connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub user: String,
    pub host: String,
}

impl RemoteTarget {
    /// Build a target from backend-reported values.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::UnsafeTarget` for a value that ssh could read as
    /// an option or that would change the meaning of `user@host`.
    pub fn new(user: String, host: String) -> Result<Self, AccessError> {
        check_part(Secret::SshUser, &user)?;
        check_part(Secret::HostIp, &host)?;
        Ok(Self { user, host })
    }

    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn remote_path(&self, path: &str) -> String {
        format!("{}:{path}", self.destination())
    }
}

fn check_part(field: Secret, value: &str) -> Result<(), AccessError> {
    let unsafe_char = |c: char| c.is_whitespace() || c.is_control() || matches!(c, '@' | '/');
    if value.is_empty() || value.starts_with('-') || value.contains(unsafe_char) {
        return Err(AccessError::UnsafeTarget {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Upload,
    Download,
}

/// A command to run on a VM, or files to copy to or from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOperation {
    Exec {
        command: Vec<String>,
    },
    Transfer {
        direction: TransferDirection,
        sources: Vec<String>,
        destination: String,
    },
}

impl RemoteOperation {
    #[must_use]
    pub fn program(&self) -> &'static str {
        match self {
            Self::Exec { .. } => "ssh",
            Self::Transfer { .. } => "scp",
        }
    }

    /// Full argument list for [`program`](Self::program).
    ///
    /// Host key checking is disabled: IM-provisioned VMs get fresh host keys
    /// on every deployment. Options end at `--`.
    #[must_use]
    pub fn args(&self, key_file: &Path, target: &RemoteTarget) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            key_file.to_string_lossy().into_owned(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "--".to_string(),
        ];
        match self {
            Self::Exec { command } => {
                args.push(target.destination());
                args.extend(command.iter().cloned());
            }
            Self::Transfer {
                direction: TransferDirection::Upload,
                sources,
                destination,
            } => {
                args.extend(sources.iter().cloned());
                args.push(target.remote_path(destination));
            }
            Self::Transfer {
                direction: TransferDirection::Download,
                sources,
                destination,
            } => {
                args.extend(sources.iter().map(|s| target.remote_path(s)));
                args.push(destination.clone());
            }
        }
        args
    }
}
