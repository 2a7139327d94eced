//! Application service: catalog-wide and per-infrastructure queries, plus
//! create and destroy.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::{Context, Result};
use apricot_common::CatalogEntry;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::application::ports::{CatalogStore, InfrastructureBackend, TokenEndpoint};
use crate::application::services::auth::AuthResolver;
use crate::domain::credential::AuthContext;
use crate::domain::extract::{VmDescriptor, VmRecord, extract_descriptors, extract_secrets};

/// Placeholder shown for a value that could not be fetched.
pub const UNAVAILABLE: &str = "Error";

/// One row of `apricot list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfrastructureSummary {
    pub name: String,
    pub infrastructure_id: String,
    pub ip: String,
    pub state: String,
}

/// Name, ID, IP and state of every catalogued infrastructure, in catalog
/// order. A failure on one row is shown as [`UNAVAILABLE`] and does not
/// affect the others.
///
/// Auth is resolved row by row (a refresh writes the catalog); the IM is
/// then queried for all rows concurrently.
///
/// # Errors
///
/// Returns an error only if the catalog itself cannot be loaded.
pub async fn list<C, E, B>(
    resolver: &AuthResolver<'_, C, E>,
    backend: &B,
    now: i64,
) -> Result<Vec<InfrastructureSummary>>
where
    C: CatalogStore,
    E: TokenEndpoint,
    B: InfrastructureBackend,
{
    let document = resolver.catalog().load()?;

    let mut resolved = Vec::with_capacity(document.infrastructures.len());
    for entry in &document.infrastructures {
        let auth = resolver.resolve(&entry.infrastructure_id, now).await;
        if let Err(e) = &auth {
            warn!(inf_id = %entry.infrastructure_id, "cannot authenticate: {e:#}");
        }
        resolved.push((entry, auth.ok()));
    }

    let rows = resolved.iter().map(|(entry, auth)| async move {
        let Some(auth) = auth else {
            return summary(entry, UNAVAILABLE.to_string(), UNAVAILABLE.to_string());
        };
        let inf_id = entry.infrastructure_id.as_str();
        let (state, info) = tokio::join!(
            backend.state(auth, inf_id),
            backend.infrastructure_info(auth, inf_id)
        );
        let state = state.unwrap_or_else(|e| {
            warn!(inf_id, "state query failed: {e:#}");
            UNAVAILABLE.to_string()
        });
        let ip = match info {
            Ok(records) => extract_secrets(&records, None).host_ip.unwrap_or_default(),
            Err(e) => {
                warn!(inf_id, "info query failed: {e:#}");
                UNAVAILABLE.to_string()
            }
        };
        summary(entry, ip, state)
    });
    Ok(join_all(rows).await)
}

fn summary(entry: &CatalogEntry, ip: String, state: String) -> InfrastructureSummary {
    InfrastructureSummary {
        name: entry.name.clone(),
        infrastructure_id: entry.infrastructure_id.clone(),
        ip,
        state,
    }
}

/// Every VM record of an infrastructure.
///
/// # Errors
///
/// Propagates auth and backend errors.
pub async fn info<C, E, B>(
    resolver: &AuthResolver<'_, C, E>,
    backend: &B,
    inf_id: &str,
    now: i64,
) -> Result<Vec<VmRecord>>
where
    C: CatalogStore,
    E: TokenEndpoint,
    B: InfrastructureBackend,
{
    let auth = resolver.resolve(inf_id, now).await?;
    backend.infrastructure_info(&auth, inf_id).await
}

/// Descriptors of the complete VMs of an infrastructure.
///
/// # Errors
///
/// Propagates auth and backend errors.
pub async fn vms<C, E, B>(
    resolver: &AuthResolver<'_, C, E>,
    backend: &B,
    inf_id: &str,
    now: i64,
) -> Result<Vec<VmDescriptor>>
where
    C: CatalogStore,
    E: TokenEndpoint,
    B: InfrastructureBackend,
{
    let records = info(resolver, backend, inf_id, now).await?;
    Ok(extract_descriptors(&records))
}

/// Contextualization log of an infrastructure.
///
/// # Errors
///
/// Propagates auth and backend errors.
pub async fn log<C, E, B>(
    resolver: &AuthResolver<'_, C, E>,
    backend: &B,
    inf_id: &str,
    now: i64,
) -> Result<String>
where
    C: CatalogStore,
    E: TokenEndpoint,
    B: InfrastructureBackend,
{
    let auth = resolver.resolve(inf_id, now).await?;
    backend.contmsg(&auth, inf_id).await
}

/// Destroy an infrastructure, then drop it from the catalog.
///
/// The catalog entry is only removed once the IM has accepted the destroy.
///
/// # Errors
///
/// Propagates auth, backend, and catalog errors.
pub async fn destroy<C, E, B>(
    resolver: &AuthResolver<'_, C, E>,
    backend: &B,
    inf_id: &str,
    now: i64,
) -> Result<String>
where
    C: CatalogStore,
    E: TokenEndpoint,
    B: InfrastructureBackend,
{
    let auth = resolver.resolve(inf_id, now).await?;
    let message = backend.destroy(&auth, inf_id).await?;
    resolver.catalog().remove(inf_id)?;
    info!(inf_id, "infrastructure destroyed and removed from catalog");
    Ok(message)
}

/// What to deploy and how to reach the providers it runs on.
#[derive(Debug, Clone)]
pub struct CreateRequest<'a> {
    pub template: &'a Path,
    pub name: &'a str,
    /// Credential fields of the new catalog entry; its ID is filled in from
    /// the IM's answer.
    pub credentials: CatalogEntry,
    pub now: i64,
}

/// Deploy a template and record the new infrastructure in the catalog.
///
/// # Errors
///
/// Propagates credential, backend, and catalog errors. Nothing is written
/// to the catalog unless the IM reports a new ID.
pub async fn create<C, E, B>(
    resolver: &AuthResolver<'_, C, E>,
    backend: &B,
    request: CreateRequest<'_>,
) -> Result<String>
where
    C: CatalogStore,
    E: TokenEndpoint,
    B: InfrastructureBackend,
{
    let mut entry = request.credentials;
    entry.name = request.name.to_string();

    let shared = resolver.catalog().load()?;
    let mut probe = entry.clone();
    probe.infrastructure_id = request.name.to_string();
    if probe.access_token.is_none() {
        probe.access_token.clone_from(&shared.access_token);
    }
    if probe.refresh_token.is_none() {
        probe.refresh_token.clone_from(&shared.refresh_token);
    }
    let resolved = resolver.resolve_entry(&probe, request.now).await?;

    let inf_id = deploy(backend, &resolved.auth, request.template).await?;
    entry.infrastructure_id.clone_from(&inf_id);
    let catalog = resolver.catalog();
    catalog.upsert(entry)?;
    if let Some(token) = &resolved.refreshed_token {
        catalog.set_access_token(&inf_id, token)?;
    }
    info!(inf_id = %inf_id, name = request.name, "infrastructure created");
    Ok(inf_id)
}

async fn deploy(
    backend: &impl InfrastructureBackend,
    auth: &AuthContext,
    template: &Path,
) -> Result<String> {
    backend
        .create(auth, template)
        .await
        .with_context(|| format!("deploying {}", template.display()))
}
