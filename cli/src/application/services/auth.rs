//! Application service: authentication material for an infrastructure.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use apricot_common::CatalogEntry;
use tracing::debug;

use crate::application::ports::{CatalogStore, TokenEndpoint};
use crate::application::services::token::{TokenManager, UsableToken};
use crate::domain::credential::{AuthContext, CredentialSpec, InfrastructureRecord};

/// Auth document plus a token that still has to be persisted, if a refresh
/// happened while building it.
#[derive(Debug)]
pub struct ResolvedAuth {
    pub auth: AuthContext,
    pub refreshed_token: Option<String>,
}

/// Builds [`AuthContext`]s from catalog records.
pub struct AuthResolver<'a, C, E> {
    catalog: &'a C,
    tokens: &'a TokenManager<E>,
}

impl<'a, C: CatalogStore, E: TokenEndpoint> AuthResolver<'a, C, E> {
    #[must_use]
    pub fn new(catalog: &'a C, tokens: &'a TokenManager<E>) -> Self {
        Self { catalog, tokens }
    }

    #[must_use]
    pub fn catalog(&self) -> &'a C {
        self.catalog
    }

    /// Auth document for a catalogued infrastructure. A token refreshed on
    /// the way is committed to the catalog before returning.
    ///
    /// # Errors
    ///
    /// `RegistryError::NotFound`, `AuthError::InvalidCredentialSpec`,
    /// `AuthError::UnknownProvider`, or any token lifecycle error.
    pub async fn resolve(&self, inf_id: &str, now: i64) -> Result<AuthContext> {
        let entry = self.catalog.get(inf_id)?;
        let resolved = self.resolve_entry(&entry, now).await?;
        if let Some(token) = &resolved.refreshed_token {
            self.catalog.set_access_token(inf_id, token)?;
            debug!(inf_id, "refreshed access token saved");
        }
        Ok(resolved.auth)
    }

    /// Auth document for an entry that may not be catalogued yet. Persisting
    /// a refreshed token is left to the caller.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve), minus `NotFound`.
    pub async fn resolve_entry(&self, entry: &CatalogEntry, now: i64) -> Result<ResolvedAuth> {
        let record = InfrastructureRecord::try_from(entry)?;
        match &record.credential {
            CredentialSpec::BearerToken { token } => {
                let usable = self
                    .tokens
                    .ensure_valid(
                        &record.infrastructure_id,
                        token.as_deref(),
                        record.refresh_token.as_deref(),
                        now,
                    )
                    .await?;
                let auth = AuthContext::for_token(&usable.token().raw);
                let refreshed_token = match usable {
                    UsableToken::Refreshed(t) => Some(t.raw),
                    UsableToken::Stored(_) => None,
                };
                Ok(ResolvedAuth {
                    auth,
                    refreshed_token,
                })
            }
            _ => Ok(ResolvedAuth {
                auth: AuthContext::for_static(&record)?,
                refreshed_token: None,
            }),
        }
    }
}
