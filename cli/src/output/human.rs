//! Human-readable terminal renderer.

use std::path::Path;
use std::process::Output;

use anyhow::Result;
use owo_colors::OwoColorize as _;
use tabled::{
    builder::Builder,
    settings::{Style, Theme},
};

use crate::application::services::inventory::InfrastructureSummary;
use crate::domain::config::ApricotConfig;
use crate::domain::extract::{VmDescriptor, VmRecord};
use crate::domain::remote::TransferDirection;
use crate::domain::token::TokenStatus;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    fn state(&self, state: &str) -> String {
        state.style(self.ctx.styles.for_state(state)).to_string()
    }

    /// Render the catalogued infrastructures as a table.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_list(&self, rows: &[InfrastructureSummary]) -> Result<()> {
        if rows.is_empty() {
            self.ctx
                .info("No infrastructures registered. Create one: apricot create <template> <name>");
            return Ok(());
        }
        let mut builder = Builder::default();
        builder.push_record(["Name", "Infrastructure ID", "IP", "State"]);
        for row in rows {
            builder.push_record([
                row.name.clone(),
                row.infrastructure_id.clone(),
                row.ip.clone(),
                self.state(&row.state),
            ]);
        }
        println!("{}", table(builder));
        Ok(())
    }

    /// Render raw VM records. Private key values are never printed.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_records(&self, inf_id: &str, records: &[VmRecord]) -> Result<()> {
        self.ctx.header(&format!("Infrastructure {inf_id}"));
        for record in records {
            println!();
            self.ctx.header(&format!(
                "VM {}",
                record.vm_id.as_deref().unwrap_or("(unknown)")
            ));
            for (key, value) in record.fields() {
                if key.ends_with("private_key") {
                    self.ctx.kv(key, "(hidden)");
                } else {
                    self.ctx.kv(key, value);
                }
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_vms(&self, inf_id: &str, vms: &[VmDescriptor]) -> Result<()> {
        if vms.is_empty() {
            self.ctx
                .warn(&format!("No fully described VMs in infrastructure {inf_id}"));
            return Ok(());
        }
        let mut builder = Builder::default();
        builder.push_record([
            "VM", "IP", "Provider", "State", "Image", "Disk", "CPUs", "Memory", "GPUs",
        ]);
        for vm in vms {
            builder.push_record([
                vm.vm_id.clone(),
                vm.ip.clone(),
                vm.provider_type.clone(),
                self.state(&vm.state),
                vm.os_image.clone().unwrap_or_default(),
                vm.disk_size.clone().unwrap_or_default(),
                vm.cpu_count.map(|c| c.to_string()).unwrap_or_default(),
                vm.memory_size.clone().unwrap_or_default(),
                vm.gpu_count.map(|c| c.to_string()).unwrap_or_default(),
            ]);
        }
        println!("{}", table(builder));
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_log(&self, _inf_id: &str, log: &str) -> Result<()> {
        print!("{log}");
        if !log.ends_with('\n') {
            println!();
        }
        Ok(())
    }

    /// Pass the remote command's output through unchanged.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_exec(&self, output: &Output) -> Result<()> {
        print!("{}", String::from_utf8_lossy(&output.stdout));
        eprint!("{}", String::from_utf8_lossy(&output.stderr));
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_transfer(
        &self,
        direction: TransferDirection,
        files: &[String],
        destination: &str,
    ) -> Result<()> {
        let verb = match direction {
            TransferDirection::Upload => "Uploaded",
            TransferDirection::Download => "Downloaded",
        };
        let noun = if files.len() == 1 { "file" } else { "files" };
        self.ctx
            .success(&format!("{verb} {} {noun} to {destination}", files.len()));
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_destroyed(&self, inf_id: &str, message: &str) -> Result<()> {
        if !message.is_empty() {
            self.ctx.info(message);
        }
        self.ctx
            .success(&format!("Infrastructure {inf_id} removed from catalog"));
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_created(&self, inf_id: &str, name: &str) -> Result<()> {
        self.ctx
            .success(&format!("Infrastructure {name} created with ID {inf_id}"));
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_token_status(&self, inf_id: &str, status: &TokenStatus) -> Result<()> {
        match status {
            TokenStatus::Valid(token) => self.ctx.success(&format!(
                "Token for {inf_id} is valid until {}",
                format_expiry(token.expiry_epoch_seconds)
            )),
            TokenStatus::Expired {
                expiry_epoch_seconds,
            } => self.ctx.warn(&format!(
                "Token for {inf_id} expired at {}",
                format_expiry(*expiry_epoch_seconds)
            )),
            TokenStatus::NoToken => self.ctx.warn(&format!("No token stored for {inf_id}")),
            TokenStatus::DecodeError(reason) => self
                .ctx
                .warn(&format!("Token for {inf_id} cannot be decoded: {reason}")),
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_tokens_stored(&self, inf_id: &str) -> Result<()> {
        self.ctx.success(&format!("Tokens stored for {inf_id}"));
        Ok(())
    }

    /// Render the current configuration.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_config(&self, config: &ApricotConfig, path: &Path) -> Result<()> {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        for (key, value) in config.entries() {
            println!("  {:<24} {value}", format!("{key}:"));
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["APRICOT_CONFIG", "APRICOT_CATALOG", "NO_COLOR"] {
            println!(
                "    {:<18} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the JSON renderer.
    pub fn render_config_set(&self, key: &str, value: &str) -> Result<()> {
        self.ctx.success(&format!("Set {key} = {value}"));
        Ok(())
    }
}

fn table(builder: Builder) -> String {
    let mut table = builder.build();
    table.with(Theme::from(Style::modern_rounded()));
    table.to_string()
}

/// UTC timestamp for an epoch expiry, falling back to the raw number.
pub(crate) fn format_expiry(epoch_seconds: i64) -> String {
    chrono::DateTime::from_timestamp(epoch_seconds, 0).map_or_else(
        || epoch_seconds.to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
