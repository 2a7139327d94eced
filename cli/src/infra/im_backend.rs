//! Backend selected by `im.backend`.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::InfrastructureBackend;
use crate::domain::config::{ApricotConfig, BackendKind};
use crate::domain::credential::AuthContext;
use crate::domain::extract::VmRecord;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::im_cli::ImCliBackend;
use crate::infra::im_rest::ImRestBackend;

pub enum ImBackend {
    Cli(ImCliBackend<TokioCommandRunner>),
    Rest(ImRestBackend),
}

impl ImBackend {
    #[must_use]
    pub fn from_config(config: &ApricotConfig) -> Self {
        let timeout = Duration::from_secs(config.timeouts.backend);
        match config.im.backend {
            BackendKind::Cli => Self::Cli(ImCliBackend::new(
                TokioCommandRunner::new(timeout),
                config.im.client.clone(),
                config.im.endpoint.clone(),
                timeout,
            )),
            BackendKind::Rest => Self::Rest(ImRestBackend::new(&config.im.endpoint, timeout)),
        }
    }
}

impl InfrastructureBackend for ImBackend {
    async fn vm_info(&self, auth: &AuthContext, inf_id: &str, vm_id: &str) -> Result<Vec<VmRecord>> {
        match self {
            Self::Cli(b) => b.vm_info(auth, inf_id, vm_id).await,
            Self::Rest(b) => b.vm_info(auth, inf_id, vm_id).await,
        }
    }

    async fn infrastructure_info(&self, auth: &AuthContext, inf_id: &str) -> Result<Vec<VmRecord>> {
        match self {
            Self::Cli(b) => b.infrastructure_info(auth, inf_id).await,
            Self::Rest(b) => b.infrastructure_info(auth, inf_id).await,
        }
    }

    async fn state(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        match self {
            Self::Cli(b) => b.state(auth, inf_id).await,
            Self::Rest(b) => b.state(auth, inf_id).await,
        }
    }

    async fn contmsg(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        match self {
            Self::Cli(b) => b.contmsg(auth, inf_id).await,
            Self::Rest(b) => b.contmsg(auth, inf_id).await,
        }
    }

    async fn destroy(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        match self {
            Self::Cli(b) => b.destroy(auth, inf_id).await,
            Self::Rest(b) => b.destroy(auth, inf_id).await,
        }
    }

    async fn create(&self, auth: &AuthContext, template: &Path) -> Result<String> {
        match self {
            Self::Cli(b) => b.create(auth, template).await,
            Self::Rest(b) => b.create(auth, template).await,
        }
    }
}
