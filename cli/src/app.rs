//! Application context: unified state passed to every command handler.
//!
//! Built once from the top-level flags and the loaded configuration; command
//! handlers borrow what they need from it instead of constructing adapters.

use std::time::Duration;

use anyhow::Result;

use crate::application::services::auth::AuthResolver;
use crate::application::services::config_service;
use crate::application::services::token::TokenManager;
use crate::domain::config::ApricotConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::im_backend::ImBackend;
use crate::infra::registry::JsonCatalog;
use crate::infra::secret_file::TempKeyFiles;
use crate::infra::token_endpoint::HttpTokenEndpoint;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    pub config_store: YamlConfigStore,
    /// Configuration loaded at startup.
    pub config: ApricotConfig,
    pub catalog: JsonCatalog,
    pub tokens: TokenManager<HttpTokenEndpoint>,
    pub backend: ImBackend,
    /// Runner for ssh and scp, bounded by `timeouts.remote`.
    pub runner: TokioCommandRunner,
    pub key_files: TempKeyFiles,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be parsed or the home
    /// directory cannot be determined.
    pub fn new(flags: &OutputFlags) -> Result<Self> {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        let config_store = YamlConfigStore;
        let config = config_service::load_config(&config_store)?;
        let catalog = JsonCatalog::new(&config)?;
        let endpoint = HttpTokenEndpoint::new(
            &config.token,
            Duration::from_secs(config.timeouts.backend),
        );
        let tokens = TokenManager::new(endpoint, config.token.refresh_leeway);
        let backend = ImBackend::from_config(&config);
        let runner = TokioCommandRunner::new(Duration::from_secs(config.timeouts.remote));

        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            mode,
            config_store,
            config,
            catalog,
            tokens,
            backend,
            runner,
            key_files: TempKeyFiles,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Spinners only in interactive human mode.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        !self.is_json() && self.output.show_progress()
    }

    #[must_use]
    pub fn resolver(&self) -> AuthResolver<'_, JsonCatalog, HttpTokenEndpoint> {
        AuthResolver::new(&self.catalog, &self.tokens)
    }

    /// Remote command timeout from `timeouts.remote`.
    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeouts.remote)
    }

    /// Current time in epoch seconds.
    #[must_use]
    pub fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}
