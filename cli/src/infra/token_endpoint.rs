//! OpenID Connect refresh-token exchange over HTTP.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::TokenEndpoint;
use crate::domain::config::TokenConfig;
use crate::domain::error::AuthError;

#[derive(Clone)]
pub struct HttpTokenEndpoint {
    agent: ureq::Agent,
    url: String,
    client_id: String,
    scope: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl HttpTokenEndpoint {
    #[must_use]
    pub fn new(config: &TokenConfig, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: config.endpoint.clone(),
            client_id: config.client_id.clone(),
            scope: config.scope.clone(),
        }
    }

    fn exchange_blocking(&self, refresh_token: &str) -> Result<String, AuthError> {
        debug!(url = %self.url, "exchanging refresh token");
        let response = self.agent.post(&self.url).send_form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("scope", &self.scope),
        ]);
        let response = match response {
            Ok(resp) if resp.status() == 200 => resp,
            Ok(resp) => return Err(AuthError::RefreshFailed(format!("HTTP {}", resp.status()))),
            Err(ureq::Error::Status(code, _)) => {
                return Err(AuthError::RefreshFailed(format!("HTTP {code}")));
            }
            Err(e) => return Err(AuthError::RefreshFailed(e.to_string())),
        };
        let body = response
            .into_string()
            .map_err(|e| AuthError::RefreshFailed(format!("unreadable response: {e}")))?;
        parse_access_token(&body)
    }
}

fn parse_access_token(body: &str) -> Result<String, AuthError> {
    serde_json::from_str::<TokenResponse>(body)
        .ok()
        .and_then(|r| r.access_token)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AuthError::RefreshFailed("response has no access_token".to_string()))
}

impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange(&self, refresh_token: &str) -> Result<String> {
        let endpoint = self.clone();
        let refresh_token = refresh_token.to_string();
        let token = tokio::task::spawn_blocking(move || endpoint.exchange_blocking(&refresh_token))
            .await
            .context("token refresh task panicked")??;
        Ok(token)
    }
}
