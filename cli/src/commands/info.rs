//! `apricot info`, `apricot vms`, and `apricot log`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::inventory;
use crate::output::progress;

/// Arguments naming one infrastructure.
#[derive(Args)]
pub struct InfraArgs {
    /// Infrastructure ID from the catalog
    pub infrastructure: String,
}

/// Run `apricot info <inf>`.
///
/// # Errors
///
/// Returns an error if auth cannot be resolved or the IM call fails.
pub async fn info(app: &AppContext, args: &InfraArgs) -> Result<ExitCode> {
    let pb = progress::maybe_spinner(app.show_progress(), "Fetching infrastructure info...");
    let resolver = app.resolver();
    let records = inventory::info(
        &resolver,
        &app.backend,
        &args.infrastructure,
        AppContext::now(),
    )
    .await;
    pb.finish_and_clear();
    app.renderer()
        .render_records(&args.infrastructure, &records?)?;
    Ok(ExitCode::SUCCESS)
}

/// Run `apricot vms <inf>`.
///
/// # Errors
///
/// Returns an error if auth cannot be resolved or the IM call fails.
pub async fn vms(app: &AppContext, args: &InfraArgs) -> Result<ExitCode> {
    let pb = progress::maybe_spinner(app.show_progress(), "Fetching VMs...");
    let resolver = app.resolver();
    let vms = inventory::vms(
        &resolver,
        &app.backend,
        &args.infrastructure,
        AppContext::now(),
    )
    .await;
    pb.finish_and_clear();
    app.renderer().render_vms(&args.infrastructure, &vms?)?;
    Ok(ExitCode::SUCCESS)
}

/// Run `apricot log <inf>`.
///
/// # Errors
///
/// Returns an error if auth cannot be resolved or the IM call fails.
pub async fn log(app: &AppContext, args: &InfraArgs) -> Result<ExitCode> {
    let resolver = app.resolver();
    let log = inventory::log(
        &resolver,
        &app.backend,
        &args.infrastructure,
        AppContext::now(),
    )
    .await?;
    app.renderer().render_log(&args.infrastructure, &log)?;
    Ok(ExitCode::SUCCESS)
}
