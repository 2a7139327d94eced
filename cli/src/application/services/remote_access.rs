//! Application service: run ssh/scp against a VM.
//!
//! Resolve auth, ask the IM for the VM's access material, write the private
//! key to a scoped owner-only file, run the operation, delete the key. The
//! key file guard is dropped on every return path, including timeouts and
//! spawn failures.

use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::application::ports::{
    CatalogStore, CommandRunner, InfrastructureBackend, SecretFileWriter, TokenEndpoint,
};
use crate::application::services::auth::AuthResolver;
use crate::domain::error::{AccessError, Secret};
use crate::domain::extract::{VmSecretBundle, extract_secrets};
use crate::domain::remote::{RemoteOperation, RemoteTarget};

/// One remote operation on one VM.
#[derive(Debug, Clone)]
pub struct RemoteRequest<'a> {
    pub inf_id: &'a str,
    pub vm_id: &'a str,
    pub operation: &'a RemoteOperation,
    pub timeout: Duration,
    /// Clock value used for token validity, in epoch seconds.
    pub now: i64,
}

/// Ports the orchestrator drives.
pub struct RemoteAccess<'a, C, E, B, R, S> {
    pub resolver: &'a AuthResolver<'a, C, E>,
    pub backend: &'a B,
    pub runner: &'a R,
    pub secrets: &'a S,
}

impl<C, E, B, R, S> RemoteAccess<'_, C, E, B, R, S>
where
    C: CatalogStore,
    E: TokenEndpoint,
    B: InfrastructureBackend,
    R: CommandRunner,
    S: SecretFileWriter,
{
    /// Run `request.operation` on the VM and return its captured output.
    ///
    /// # Errors
    ///
    /// - auth resolution errors, unchanged;
    /// - `AccessError::ExtractionMissing` naming the first missing piece of
    ///   access material, before anything is written or spawned;
    /// - `AccessError::SubprocessFailure` on a non-zero exit, with stderr;
    /// - `AccessError::Timeout` when the runner gives up.
    pub async fn run(&self, request: &RemoteRequest<'_>) -> Result<Output> {
        let auth = self.resolver.resolve(request.inf_id, request.now).await?;

        let records = self
            .backend
            .vm_info(&auth, request.inf_id, request.vm_id)
            .await?;
        let mut bundle = extract_secrets(&records, Some(request.vm_id));
        if bundle.ssh_username.is_none() || bundle.host_ip.is_none() {
            debug!(
                inf_id = request.inf_id,
                vm_id = request.vm_id,
                "VM info incomplete, consulting infrastructure info"
            );
            let all = self
                .backend
                .infrastructure_info(&auth, request.inf_id)
                .await?;
            bundle = bundle.or(extract_secrets(&all, Some(request.vm_id)));
        }

        let (key, target) = require_access(bundle)?;
        let key_file = self.secrets.write_secret(&key)?;

        let program = request.operation.program();
        let args = request.operation.args(key_file.as_ref(), &target);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        info!(program, host = %target.host, vm_id = request.vm_id, "running remote operation");

        let output = self
            .runner
            .run_with_timeout(program, &arg_refs, request.timeout)
            .await;
        drop(key_file);
        let output = output?;

        if !output.status.success() {
            return Err(AccessError::SubprocessFailure {
                program: program.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(output)
    }
}

/// Split a bundle into key and target, failing on the first missing or
/// unusable piece.
fn require_access(bundle: VmSecretBundle) -> Result<(String, RemoteTarget), AccessError> {
    let key = bundle
        .private_key_pem
        .ok_or(AccessError::ExtractionMissing(Secret::PrivateKey))?;
    let user = bundle
        .ssh_username
        .ok_or(AccessError::ExtractionMissing(Secret::SshUser))?;
    let host = bundle
        .host_ip
        .ok_or(AccessError::ExtractionMissing(Secret::HostIp))?;
    Ok((key, RemoteTarget::new(user, host)?))
}
