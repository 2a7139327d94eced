//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;
use crate::domain::remote::TransferDirection;

/// Manage Infrastructure Manager deployments and reach their VMs
#[derive(Parser)]
#[command(
    name = "apricot",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List catalogued infrastructures with IP and state
    List,

    /// Show every VM record of an infrastructure
    Info(commands::info::InfraArgs),

    /// Show the VMs of an infrastructure
    Vms(commands::info::InfraArgs),

    /// Show the contextualization log
    Log(commands::info::InfraArgs),

    /// Run a command on a VM over ssh
    Exec(commands::exec::ExecArgs),

    /// Copy local files to a VM
    Upload(commands::transfer::TransferArgs),

    /// Copy files from a VM
    Download(commands::transfer::TransferArgs),

    /// Destroy an infrastructure and remove it from the catalog
    Destroy(commands::info::InfraArgs),

    /// Deploy a template and record the new infrastructure
    Create(commands::create::CreateArgs),

    /// Manage access and refresh tokens
    #[command(subcommand)]
    Token(commands::token::TokenCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot be built or the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose: _,
            command,
        } = self;
        let app = AppContext::new(&OutputFlags {
            no_color,
            quiet,
            json,
        })?;

        match command {
            Command::List => commands::list::run(&app).await,
            Command::Info(args) => commands::info::info(&app, &args).await,
            Command::Vms(args) => commands::info::vms(&app, &args).await,
            Command::Log(args) => commands::info::log(&app, &args).await,
            Command::Exec(args) => commands::exec::run(&app, args).await,
            Command::Upload(args) => {
                commands::transfer::run(&app, TransferDirection::Upload, args).await
            }
            Command::Download(args) => {
                commands::transfer::run(&app, TransferDirection::Download, args).await
            }
            Command::Destroy(args) => commands::destroy::run(&app, &args).await,
            Command::Create(args) => commands::create::run(&app, &args).await,
            Command::Token(cmd) => commands::token::run(&app, cmd),
            Command::Config(cmd) => commands::config::run(&app, cmd),
        }
    }
}
