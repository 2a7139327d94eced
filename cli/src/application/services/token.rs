//! Application service: bearer token lifecycle.
//!
//! `Unknown -> Valid | Expired -> Refreshing -> Valid | RefreshFailed`.
//! A refresh is attempted at most once per resolution; the refreshed token
//! is handed back to the caller, which commits it through the catalog.

use anyhow::Result;
use tracing::{debug, info};

use crate::application::ports::{CatalogStore, TokenEndpoint};
use crate::domain::error::{AuthError, RegistryError};
use crate::domain::token::{BearerToken, TokenStatus, check_token};

/// A token that is usable right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsableToken {
    /// The stored token was still valid.
    Stored(BearerToken),
    /// The stored token was expired or unreadable and has been replaced.
    Refreshed(BearerToken),
}

impl UsableToken {
    #[must_use]
    pub fn token(&self) -> &BearerToken {
        match self {
            Self::Stored(t) | Self::Refreshed(t) => t,
        }
    }
}

/// Decides when a token needs refreshing and performs the exchange.
pub struct TokenManager<E> {
    endpoint: E,
    leeway_secs: i64,
}

impl<E: TokenEndpoint> TokenManager<E> {
    /// `leeway_secs`: tokens expiring within this window count as expired.
    #[must_use]
    pub fn new(endpoint: E, leeway_secs: u64) -> Self {
        Self {
            endpoint,
            leeway_secs: i64::try_from(leeway_secs).unwrap_or(i64::MAX),
        }
    }

    /// Return a token valid at `now`, refreshing once if needed.
    ///
    /// # Errors
    ///
    /// - `AuthError::NoToken` when there is neither an access nor a refresh token.
    /// - `AuthError::NoRefreshToken` when the access token is expired and
    ///   nothing can renew it.
    /// - `AuthError::TokenDecode` when the access token is malformed and
    ///   nothing can renew it.
    /// - `AuthError::RefreshFailed` when the exchange fails or yields an
    ///   unreadable token, `AuthError::TokenExpired` when the refreshed token
    ///   is expired too. Neither is retried.
    pub async fn ensure_valid(
        &self,
        inf_id: &str,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        now: i64,
    ) -> Result<UsableToken> {
        let refresh_token = refresh_token.map(str::trim).filter(|t| !t.is_empty());
        let horizon = now.saturating_add(self.leeway_secs);

        match check_token(access_token, horizon) {
            TokenStatus::Valid(token) => return Ok(UsableToken::Stored(token)),
            TokenStatus::NoToken if refresh_token.is_none() => {
                return Err(AuthError::NoToken {
                    id: inf_id.to_string(),
                }
                .into());
            }
            TokenStatus::Expired { .. } if refresh_token.is_none() => {
                return Err(AuthError::NoRefreshToken {
                    id: inf_id.to_string(),
                }
                .into());
            }
            TokenStatus::DecodeError(reason) if refresh_token.is_none() => {
                return Err(AuthError::TokenDecode(reason).into());
            }
            status => debug!(inf_id, ?status, "access token needs refreshing"),
        }

        let Some(refresh_token) = refresh_token else {
            return Err(AuthError::NoRefreshToken {
                id: inf_id.to_string(),
            }
            .into());
        };
        self.refresh(inf_id, refresh_token, now)
            .await
            .map(UsableToken::Refreshed)
    }

    /// Exchange `refresh_token` for a new access token valid at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` if the endpoint hands back a token
    /// that is already expired, `AuthError::RefreshFailed` if it rejects the
    /// exchange or returns an unreadable token.
    pub async fn refresh(&self, inf_id: &str, refresh_token: &str, now: i64) -> Result<BearerToken> {
        let raw = self.endpoint.exchange(refresh_token).await?;
        match check_token(Some(&raw), now) {
            TokenStatus::Valid(token) => {
                info!(inf_id, expires = token.expiry_epoch_seconds, "access token refreshed");
                Ok(token)
            }
            TokenStatus::Expired { .. } => Err(AuthError::TokenExpired.into()),
            TokenStatus::NoToken => {
                Err(AuthError::RefreshFailed("endpoint returned an empty token".to_string()).into())
            }
            TokenStatus::DecodeError(reason) => Err(AuthError::RefreshFailed(format!(
                "endpoint returned an unreadable token: {reason}"
            ))
            .into()),
        }
    }
}

/// Status of the access token stored for `inf_id`, read strictly at `now`.
///
/// # Errors
///
/// Returns `RegistryError::NotFound` for an unknown ID.
pub fn token_status(catalog: &impl CatalogStore, inf_id: &str, now: i64) -> Result<TokenStatus> {
    let entry = catalog.get(inf_id)?;
    Ok(check_token(entry.access_token.as_deref(), now))
}

/// Store operator-supplied tokens on the entry of `inf_id` itself.
///
/// # Errors
///
/// Returns `RegistryError::NotFound` for an unknown ID and
/// `AuthError::TokenDecode` if `access_token` is not a readable token.
pub fn store_tokens(
    catalog: &impl CatalogStore,
    inf_id: &str,
    refresh_token: &str,
    access_token: Option<&str>,
) -> Result<()> {
    if let Some(access) = access_token {
        BearerToken::decode(access)?;
    }
    catalog.update(|doc| {
        let Some(entry) = doc
            .infrastructures
            .iter_mut()
            .find(|e| e.infrastructure_id == inf_id)
        else {
            return Err(RegistryError::NotFound(inf_id.to_string()).into());
        };
        entry.refresh_token = Some(refresh_token.to_string());
        if let Some(access) = access_token {
            entry.access_token = Some(access.to_string());
        }
        Ok(true)
    })?;
    Ok(())
}
