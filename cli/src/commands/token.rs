//! `apricot token`: inspect and supply access/refresh tokens.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::token;

/// Token subcommands.
#[derive(Subcommand)]
pub enum TokenCommand {
    /// Show whether the stored access token is still valid
    Status {
        /// Infrastructure ID from the catalog
        infrastructure: String,
    },
    /// Store tokens on an infrastructure record
    Set {
        /// Infrastructure ID from the catalog
        infrastructure: String,
        /// OIDC refresh token
        #[arg(long)]
        refresh_token: String,
        /// OIDC access token
        #[arg(long)]
        access_token: Option<String>,
    },
}

/// Run the token command.
///
/// # Errors
///
/// Returns an error if the ID is not catalogued or a supplied access token
/// cannot be decoded.
pub fn run(app: &AppContext, cmd: TokenCommand) -> Result<ExitCode> {
    match cmd {
        TokenCommand::Status { infrastructure } => {
            let status = token::token_status(&app.catalog, &infrastructure, AppContext::now())?;
            app.renderer()
                .render_token_status(&infrastructure, &status)?;
        }
        TokenCommand::Set {
            infrastructure,
            refresh_token,
            access_token,
        } => {
            token::store_tokens(
                &app.catalog,
                &infrastructure,
                &refresh_token,
                access_token.as_deref(),
            )?;
            app.renderer().render_tokens_stored(&infrastructure)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
