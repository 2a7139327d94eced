//! `InfrastructureBackend` over the IM command-line client.
//!
//! Every call renders the auth document into a scoped owner-only file, runs
//! `<client> -a <authfile> -r <endpoint> <operation> ...`, and translates the
//! text answer into records.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::application::ports::{CommandRunner, InfrastructureBackend};
use crate::domain::credential::AuthContext;
use crate::domain::error::{AccessError, Secret};
use crate::domain::extract::{VmRecord, created_infrastructure_id, infrastructure_state};
use crate::infra::secret_file::ScopedSecretFile;

pub struct ImCliBackend<R> {
    runner: R,
    client: String,
    endpoint: String,
    timeout: Duration,
}

impl<R: CommandRunner> ImCliBackend<R> {
    #[must_use]
    pub fn new(runner: R, client: String, endpoint: String, timeout: Duration) -> Self {
        Self {
            runner,
            client,
            endpoint,
            timeout,
        }
    }

    /// Run one client operation and return its stdout.
    async fn call(&self, auth: &AuthContext, operation: &[&str]) -> Result<String> {
        let auth_file = ScopedSecretFile::create("apricot-auth-", &auth.to_file_contents())?;
        let auth_path = auth_file.path().to_string_lossy().into_owned();

        let mut args = vec!["-a", auth_path.as_str(), "-r", self.endpoint.as_str()];
        args.extend_from_slice(operation);
        debug!(client = %self.client, operation = ?operation, "IM client call");

        let output = self
            .runner
            .run_with_timeout(&self.client, &args, self.timeout)
            .await;
        drop(auth_file);
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            // The IM client reports most failures on stdout.
            let stderr = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(AccessError::SubprocessFailure {
                program: self.client.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr,
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl<R: CommandRunner> InfrastructureBackend for ImCliBackend<R> {
    async fn vm_info(&self, auth: &AuthContext, inf_id: &str, vm_id: &str) -> Result<Vec<VmRecord>> {
        let raw = self.call(auth, &["getvminfo", inf_id, vm_id]).await?;
        let mut records = VmRecord::parse_text(&raw);
        for record in &mut records {
            if record.vm_id.is_none() {
                record.vm_id = Some(vm_id.to_string());
            }
        }
        Ok(records)
    }

    async fn infrastructure_info(&self, auth: &AuthContext, inf_id: &str) -> Result<Vec<VmRecord>> {
        let raw = self.call(auth, &["getinfo", inf_id]).await?;
        Ok(VmRecord::parse_text(&raw))
    }

    async fn state(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        let raw = self.call(auth, &["getstate", inf_id]).await?;
        infrastructure_state(&raw).ok_or_else(|| AccessError::ExtractionMissing(Secret::State).into())
    }

    async fn contmsg(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        self.call(auth, &["getcontmsg", inf_id]).await
    }

    async fn destroy(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        let raw = self.call(auth, &["destroy", inf_id]).await?;
        Ok(raw.trim().to_string())
    }

    async fn create(&self, auth: &AuthContext, template: &Path) -> Result<String> {
        let template = template.to_string_lossy();
        let raw = self.call(auth, &["create", template.as_ref()]).await?;
        created_infrastructure_id(&raw)
            .with_context(|| format!("IM client did not report an infrastructure ID: {}", raw.trim()))
    }
}
