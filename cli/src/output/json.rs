//! JSON output.
//!
//! Every `--json` code path prints exactly one pretty-printed object to
//! stdout; failures print the error object from [`format_error`].

use std::path::Path;
use std::process::Output;

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};

use crate::application::services::inventory::InfrastructureSummary;
use crate::domain::config::ApricotConfig;
use crate::domain::error::{AccessError, AuthError, ConfigError, RegistryError};
use crate::domain::extract::{VmDescriptor, VmRecord};
use crate::domain::remote::TransferDirection;
use crate::domain::token::TokenStatus;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable machine-readable code for the root cause of `err`.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<RegistryError>() {
        return match e {
            RegistryError::NotFound(_) => "not_found",
            RegistryError::CorruptCatalog { .. } => "corrupt_catalog",
            RegistryError::Conflict { .. } => "catalog_conflict",
        };
    }
    if let Some(e) = err.downcast_ref::<AuthError>() {
        return match e {
            AuthError::InvalidCredentialSpec { .. } => "invalid_credential_spec",
            AuthError::UnknownProvider { .. } => "unknown_provider",
            AuthError::TokenExpired => "token_expired",
            AuthError::NoToken { .. } => "no_token",
            AuthError::NoRefreshToken { .. } => "no_refresh_token",
            AuthError::TokenDecode(_) => "token_decode",
            AuthError::RefreshFailed(_) => "refresh_failed",
        };
    }
    if let Some(e) = err.downcast_ref::<AccessError>() {
        return match e {
            AccessError::ExtractionMissing(_) => "extraction_missing",
            AccessError::UnsafeTarget { .. } => "unsafe_target",
            AccessError::SubprocessFailure { .. } => "subprocess_failure",
            AccessError::Timeout { .. } => "timeout",
            AccessError::BackendFailure { .. } => "backend_failure",
            AccessError::BackendUnreachable { .. } => "backend_unreachable",
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return "invalid_config";
    }
    "error"
}

/// Renders command results as JSON objects on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &Value) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_list(&self, rows: &[InfrastructureSummary]) -> Result<()> {
        Self::print(&json!({ "infrastructures": rows }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_records(&self, inf_id: &str, records: &[VmRecord]) -> Result<()> {
        let vms: Vec<Value> = records
            .iter()
            .map(|record| {
                let fields: Map<String, Value> = record
                    .fields()
                    .filter(|(k, _)| !k.ends_with("private_key"))
                    .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                    .collect();
                json!({ "vm_id": record.vm_id, "fields": fields })
            })
            .collect();
        Self::print(&json!({ "infrastructure_id": inf_id, "vms": vms }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_vms(&self, inf_id: &str, vms: &[VmDescriptor]) -> Result<()> {
        Self::print(&json!({ "infrastructure_id": inf_id, "vms": vms }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_log(&self, inf_id: &str, log: &str) -> Result<()> {
        Self::print(&json!({ "infrastructure_id": inf_id, "log": log }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_exec(&self, output: &Output) -> Result<()> {
        Self::print(&json!({
            "exit_code": output.status.code(),
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_transfer(
        &self,
        direction: TransferDirection,
        files: &[String],
        destination: &str,
    ) -> Result<()> {
        let direction = match direction {
            TransferDirection::Upload => "upload",
            TransferDirection::Download => "download",
        };
        Self::print(&json!({
            "direction": direction,
            "files": files,
            "destination": destination,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_destroyed(&self, inf_id: &str, message: &str) -> Result<()> {
        Self::print(&json!({
            "infrastructure_id": inf_id,
            "destroyed": true,
            "message": message,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_created(&self, inf_id: &str, name: &str) -> Result<()> {
        Self::print(&json!({ "infrastructure_id": inf_id, "name": name }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_token_status(&self, inf_id: &str, status: &TokenStatus) -> Result<()> {
        let body = match status {
            TokenStatus::Valid(token) => json!({
                "status": "valid",
                "expires_at": token.expiry_epoch_seconds,
            }),
            TokenStatus::Expired {
                expiry_epoch_seconds,
            } => json!({ "status": "expired", "expires_at": expiry_epoch_seconds }),
            TokenStatus::NoToken => json!({ "status": "no_token" }),
            TokenStatus::DecodeError(reason) => {
                json!({ "status": "decode_error", "reason": reason })
            }
        };
        let mut body = body;
        body["infrastructure_id"] = json!(inf_id);
        Self::print(&body)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_tokens_stored(&self, inf_id: &str) -> Result<()> {
        Self::print(&json!({ "infrastructure_id": inf_id, "stored": true }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config(&self, config: &ApricotConfig, path: &Path) -> Result<()> {
        let settings: Map<String, Value> = config
            .entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v)))
            .collect();
        Self::print(&json!({
            "path": path.display().to_string(),
            "settings": settings,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config_set(&self, key: &str, value: &str) -> Result<()> {
        Self::print(&json!({ "key": key, "value": value }))
    }
}
