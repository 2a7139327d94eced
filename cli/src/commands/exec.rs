//! `apricot exec`: run a command on a VM over ssh.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::remote_access::{RemoteAccess, RemoteRequest};
use crate::domain::remote::RemoteOperation;

/// Arguments for the exec command.
#[derive(Args)]
pub struct ExecArgs {
    /// Infrastructure ID from the catalog
    pub infrastructure: String,
    /// VM ID within the infrastructure
    pub vm: String,
    /// Command and arguments to run on the VM
    #[arg(required = true, allow_hyphen_values = true, last = true)]
    pub command: Vec<String>,
}

/// Run a command on a VM and print its output.
///
/// # Errors
///
/// Returns an error if access material is missing, ssh cannot be run, or the
/// remote command exits non-zero.
pub async fn run(app: &AppContext, args: ExecArgs) -> Result<ExitCode> {
    let operation = RemoteOperation::Exec {
        command: args.command,
    };
    let resolver = app.resolver();
    let access = RemoteAccess {
        resolver: &resolver,
        backend: &app.backend,
        runner: &app.runner,
        secrets: &app.key_files,
    };
    let output = access
        .run(&RemoteRequest {
            inf_id: &args.infrastructure,
            vm_id: &args.vm,
            operation: &operation,
            timeout: app.remote_timeout(),
            now: AppContext::now(),
        })
        .await?;
    app.renderer().render_exec(&output)?;
    Ok(ExitCode::SUCCESS)
}
