//! Bearer token inspection.
//!
//! The payload is decoded without verifying the signature: the token is only
//! inspected for its expiry, and the Infrastructure Manager re-validates it
//! on every request.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::domain::error::AuthError;

/// An access token together with the expiry read from its payload.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    pub raw: String,
    pub expiry_epoch_seconds: i64,
}

impl BearerToken {
    /// Decode `raw` and read its `exp` claim.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenDecode` if the token is not a three-part JWT,
    /// its payload is not base64url JSON, or it carries no numeric `exp`.
    pub fn decode(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        let mut parts = raw.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::TokenDecode(
                "expected three dot-separated segments".to_string(),
            ));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::TokenDecode(format!("payload is not base64url: {e}")))?;
        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::TokenDecode(format!("payload is not JSON: {e}")))?;
        let exp = claims
            .exp
            .ok_or_else(|| AuthError::TokenDecode("payload has no exp claim".to_string()))?;

        #[allow(clippy::cast_possible_truncation)]
        let expiry_epoch_seconds = exp.floor() as i64;
        Ok(Self {
            raw: raw.to_string(),
            expiry_epoch_seconds,
        })
    }

    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiry_epoch_seconds <= now
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("raw", &"<redacted>")
            .field("expiry_epoch_seconds", &self.expiry_epoch_seconds)
            .finish()
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Outcome of inspecting a stored access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid(BearerToken),
    Expired { expiry_epoch_seconds: i64 },
    NoToken,
    DecodeError(String),
}

/// Inspect `raw` against the clock value `now` (epoch seconds).
///
/// A token whose expiry is at or before `now` is expired. Never fails:
/// malformed tokens are reported as `DecodeError`.
#[must_use]
pub fn check_token(raw: Option<&str>, now: i64) -> TokenStatus {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return TokenStatus::NoToken;
    };
    match BearerToken::decode(raw) {
        Ok(token) if token.is_expired_at(now) => TokenStatus::Expired {
            expiry_epoch_seconds: token.expiry_epoch_seconds,
        },
        Ok(token) => TokenStatus::Valid(token),
        Err(AuthError::TokenDecode(reason)) => TokenStatus::DecodeError(reason),
        Err(other) => TokenStatus::DecodeError(other.to_string()),
    }
}

/// Test helper: an unsigned token whose payload carries `exp`.
#[cfg(test)]
pub(crate) fn unsigned_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"op","exp":{exp}}}"#));
    format!("{header}.{payload}.sig")
}
