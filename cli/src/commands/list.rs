//! `apricot list`: every catalogued infrastructure with its IP and state.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::inventory;
use crate::output::progress;

/// Run `apricot list`.
///
/// # Errors
///
/// Returns an error only if the catalog cannot be read; per-row failures are
/// shown in the table.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let pb = progress::maybe_spinner(app.show_progress(), "Querying infrastructures...");
    let resolver = app.resolver();
    let rows = inventory::list(&resolver, &app.backend, AppContext::now()).await;
    pb.finish_and_clear();
    app.renderer().render_list(&rows?)?;
    Ok(ExitCode::SUCCESS)
}
