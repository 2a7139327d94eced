//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod styles;

use std::path::Path;
use std::process::Output;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use styles::Styles;

use crate::application::services::inventory::InfrastructureSummary;
use crate::domain::config::ApricotConfig;
use crate::domain::extract::{VmDescriptor, VmRecord};
use crate::domain::remote::TransferDirection;
use crate::domain::token::TokenStatus;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Renderer selected from the output mode; commands call it without
/// branching on `--json`.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

macro_rules! delegate {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        match $self {
            Renderer::Human(r) => r.$method($($arg),*),
            Renderer::Json(r) => r.$method($($arg),*),
        }
    };
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_list(&self, rows: &[InfrastructureSummary]) -> Result<()> {
        delegate!(self, render_list(rows))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_records(&self, inf_id: &str, records: &[VmRecord]) -> Result<()> {
        delegate!(self, render_records(inf_id, records))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_vms(&self, inf_id: &str, vms: &[VmDescriptor]) -> Result<()> {
        delegate!(self, render_vms(inf_id, vms))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_log(&self, inf_id: &str, log: &str) -> Result<()> {
        delegate!(self, render_log(inf_id, log))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_exec(&self, output: &Output) -> Result<()> {
        delegate!(self, render_exec(output))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_transfer(
        &self,
        direction: TransferDirection,
        files: &[String],
        destination: &str,
    ) -> Result<()> {
        delegate!(self, render_transfer(direction, files, destination))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_destroyed(&self, inf_id: &str, message: &str) -> Result<()> {
        delegate!(self, render_destroyed(inf_id, message))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_created(&self, inf_id: &str, name: &str) -> Result<()> {
        delegate!(self, render_created(inf_id, name))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_token_status(&self, inf_id: &str, status: &TokenStatus) -> Result<()> {
        delegate!(self, render_token_status(inf_id, status))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_tokens_stored(&self, inf_id: &str) -> Result<()> {
        delegate!(self, render_tokens_stored(inf_id))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_config(&self, config: &ApricotConfig, path: &Path) -> Result<()> {
        delegate!(self, render_config(config, path))
    }

    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_config_set(&self, key: &str, value: &str) -> Result<()> {
        delegate!(self, render_config_set(key, value))
    }
}
