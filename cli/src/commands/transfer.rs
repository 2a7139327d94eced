//! `apricot upload` and `apricot download`: scp to or from a VM.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::remote_access::{RemoteAccess, RemoteRequest};
use crate::domain::remote::{RemoteOperation, TransferDirection};
use crate::output::progress;

/// Arguments shared by upload and download.
#[derive(Args)]
pub struct TransferArgs {
    /// Infrastructure ID from the catalog
    pub infrastructure: String,
    /// VM ID within the infrastructure
    pub vm: String,
    /// Files to copy, followed by the destination
    #[arg(required = true, num_args = 2..)]
    pub paths: Vec<String>,
}

/// Copy files in `direction`. The last path is the destination.
///
/// # Errors
///
/// Returns an error if access material is missing or scp fails.
pub async fn run(
    app: &AppContext,
    direction: TransferDirection,
    mut args: TransferArgs,
) -> Result<ExitCode> {
    let Some(destination) = args.paths.pop() else {
        anyhow::bail!("missing destination");
    };
    let sources = args.paths;
    let operation = RemoteOperation::Transfer {
        direction,
        sources: sources.clone(),
        destination: destination.clone(),
    };

    let pb = progress::maybe_spinner(app.show_progress(), "Copying files...");
    let resolver = app.resolver();
    let access = RemoteAccess {
        resolver: &resolver,
        backend: &app.backend,
        runner: &app.runner,
        secrets: &app.key_files,
    };
    let result = access
        .run(&RemoteRequest {
            inf_id: &args.infrastructure,
            vm_id: &args.vm,
            operation: &operation,
            timeout: app.remote_timeout(),
            now: AppContext::now(),
        })
        .await;
    pb.finish_and_clear();
    result?;

    app.renderer()
        .render_transfer(direction, &sources, &destination)?;
    Ok(ExitCode::SUCCESS)
}
