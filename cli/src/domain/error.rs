//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator, so callers can recover the exact variant with
//! `downcast_ref`.

use std::fmt;

use thiserror::Error;

// ── Registry errors ───────────────────────────────────────────────────────────

/// Errors raised by the infrastructure catalog.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Infrastructure '{0}' not found in the catalog.")]
    NotFound(String),

    #[error("Catalog {path} is corrupt: {reason}")]
    CorruptCatalog { path: String, reason: String },

    #[error("Catalog {path} changed while it was being updated. Retry the command.")]
    Conflict { path: String },
}

// ── Auth errors ───────────────────────────────────────────────────────────────

/// Errors raised while building authentication material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Infrastructure '{id}' is missing required credential field '{field}'.")]
    InvalidCredentialSpec { id: String, field: &'static str },

    #[error("Infrastructure '{id}' has unknown provider type '{kind}'.")]
    UnknownProvider { id: String, kind: String },

    #[error(
        "Access token has expired and the refreshed token is expired too. Check the token endpoint and the system clock."
    )]
    TokenExpired,

    #[error(
        "Infrastructure '{id}' has no access token. Supply one with: apricot token set {id} --refresh-token <token>"
    )]
    NoToken { id: String },

    #[error(
        "Infrastructure '{id}' has no refresh token. Supply one with: apricot token set {id} --refresh-token <token>"
    )]
    NoRefreshToken { id: String },

    #[error("Access token cannot be decoded: {0}")]
    TokenDecode(String),

    #[error("Token refresh failed: {0}. Supply a fresh refresh token with 'apricot token set'.")]
    RefreshFailed(String),
}

// ── Remote access errors ──────────────────────────────────────────────────────

/// A piece of VM information the backend response did not contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    PrivateKey,
    SshUser,
    HostIp,
    State,
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PrivateKey => "private key",
            Self::SshUser => "SSH username",
            Self::HostIp => "host IP address",
            Self::State => "infrastructure state",
        })
    }
}

/// Errors raised while reaching a VM or driving an external process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Backend response contains no {0}.")]
    ExtractionMissing(Secret),

    #[error("Backend reported an unusable {field}: '{value}'")]
    UnsafeTarget { field: Secret, value: String },

    #[error("{program} exited with {code}: {stderr}")]
    SubprocessFailure {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("IM returned HTTP {status}: {body}")]
    BackendFailure { status: u16, body: String },

    #[error("Cannot reach IM at {url}: {reason}")]
    BackendUnreachable { url: String, reason: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}
