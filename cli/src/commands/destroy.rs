//! `apricot destroy`: tear down an infrastructure and drop it from the catalog.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::inventory;
use crate::commands::info::InfraArgs;
use crate::output::progress;

/// Run `apricot destroy <inf>`.
///
/// # Errors
///
/// Returns an error if the IM refuses the destroy; the catalog entry is kept
/// in that case.
pub async fn run(app: &AppContext, args: &InfraArgs) -> Result<ExitCode> {
    let pb = progress::maybe_spinner(
        app.show_progress(),
        &format!("Destroying {}...", args.infrastructure),
    );
    let resolver = app.resolver();
    let result = inventory::destroy(
        &resolver,
        &app.backend,
        &args.infrastructure,
        AppContext::now(),
    )
    .await;
    let message = match result {
        Ok(message) => {
            progress::finish_ok(&pb, &format!("Destroyed {}", args.infrastructure));
            message
        }
        Err(e) => {
            progress::finish_error(&pb);
            return Err(e);
        }
    };
    app.renderer()
        .render_destroyed(&args.infrastructure, &message)?;
    Ok(ExitCode::SUCCESS)
}
