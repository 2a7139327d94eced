//! `apricot create`: deploy a template and record the new infrastructure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use apricot_common::catalog::CatalogEntry;
use clap::Args;
use serde_json::Value;

use crate::app::AppContext;
use crate::application::services::inventory::{self, CreateRequest};
use crate::output::progress;

/// Arguments for the create command.
#[derive(Args)]
pub struct CreateArgs {
    /// RADL or TOSCA template to deploy
    pub template: PathBuf,
    /// Name recorded in the catalog
    #[arg(long)]
    pub name: String,
    /// Provider credentials as a JSON object in catalog field names
    /// (`type`, `host`, `user`, `pass`, ...), or `@file` to read them
    #[arg(long)]
    pub credentials: String,
}

/// Run `apricot create`.
///
/// # Errors
///
/// Returns an error if the credentials are malformed, auth cannot be built,
/// or the IM does not return a new infrastructure ID.
pub async fn run(app: &AppContext, args: &CreateArgs) -> Result<ExitCode> {
    let raw = match args.credentials.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read credentials from {path}"))?,
        None => args.credentials.clone(),
    };
    let credentials = parse_credentials(&raw)?;

    let pb = progress::maybe_spinner(
        app.show_progress(),
        &format!("Deploying {}...", args.template.display()),
    );
    let resolver = app.resolver();
    let result = inventory::create(
        &resolver,
        &app.backend,
        CreateRequest {
            template: &args.template,
            name: &args.name,
            credentials,
            now: AppContext::now(),
        },
    )
    .await;
    let inf_id = match result {
        Ok(inf_id) => {
            progress::finish_ok(&pb, &format!("Deployed {}", args.name));
            inf_id
        }
        Err(e) => {
            progress::finish_error(&pb);
            return Err(e);
        }
    };
    app.renderer().render_created(&inf_id, &args.name)?;
    Ok(ExitCode::SUCCESS)
}

/// Parse a credentials object into a catalog entry whose ID is still empty.
///
/// # Errors
///
/// Returns an error if `raw` is not a JSON object of catalog fields.
pub fn parse_credentials(raw: &str) -> Result<CatalogEntry> {
    let mut value: Value = serde_json::from_str(raw).context("credentials are not valid JSON")?;
    let Some(object) = value.as_object_mut() else {
        anyhow::bail!("credentials must be a JSON object");
    };
    object
        .entry("infrastructureID")
        .or_insert_with(|| Value::String(String::new()));
    serde_json::from_value(value).context("credentials do not match the catalog entry format")
}
