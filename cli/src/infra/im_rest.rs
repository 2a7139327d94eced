//! `InfrastructureBackend` over the IM REST API.
//!
//! `ureq` is blocking, so every request runs on the blocking pool.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::application::ports::InfrastructureBackend;
use crate::domain::credential::AuthContext;
use crate::domain::error::{AccessError, Secret};
use crate::domain::extract::VmRecord;

pub struct ImRestBackend {
    agent: ureq::Agent,
    endpoint: String,
    timeout: Duration,
}

/// One request, owned so it can move onto the blocking pool.
struct Call {
    method: &'static str,
    url: String,
    accept: &'static str,
    authorization: String,
    body: Option<(String, &'static str)>,
}

impl ImRestBackend {
    #[must_use]
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }

    async fn send(&self, call: Call) -> Result<String> {
        let agent = self.agent.clone();
        let timeout = self.timeout;
        let body = tokio::task::spawn_blocking(move || send_blocking(&agent, &call, timeout))
            .await
            .context("IM request task panicked")??;
        Ok(body)
    }

    async fn get(&self, auth: &AuthContext, url: String, accept: &'static str) -> Result<String> {
        self.send(Call {
            method: "GET",
            url,
            accept,
            authorization: auth.to_header_value(),
            body: None,
        })
        .await
    }

    async fn get_json(&self, auth: &AuthContext, url: String) -> Result<Value> {
        let body = self.get(auth, url.clone(), "application/json").await?;
        serde_json::from_str(&body).with_context(|| format!("IM returned invalid JSON for {url}"))
    }
}

fn send_blocking(agent: &ureq::Agent, call: &Call, timeout: Duration) -> Result<String, AccessError> {
    debug!(method = call.method, url = %call.url, "IM request");
    let request = agent
        .request(call.method, &call.url)
        .set("Authorization", &call.authorization)
        .set("Accept", call.accept);
    let response = match &call.body {
        Some((body, content_type)) => request.set("Content-Type", content_type).send_string(body),
        None => request.call(),
    };
    let cannot_reach = |reason: String| AccessError::BackendUnreachable {
        url: call.url.clone(),
        reason,
    };
    match response {
        Ok(resp) => resp.into_string().map_err(|e| {
            if is_timeout(&e) {
                rest_timeout(timeout)
            } else {
                cannot_reach(e.to_string())
            }
        }),
        Err(ureq::Error::Status(status, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(AccessError::BackendFailure {
                status,
                body: body.trim().to_string(),
            })
        }
        Err(ureq::Error::Transport(transport)) => {
            if is_timeout(&transport) {
                Err(rest_timeout(timeout))
            } else {
                Err(cannot_reach(transport.to_string()))
            }
        }
    }
}

fn rest_timeout(timeout: Duration) -> AccessError {
    AccessError::Timeout {
        program: "IM REST API".to_string(),
        secs: timeout.as_secs(),
    }
}

/// Whether `err` or one of its sources is an I/O timeout.
fn is_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let timed_out = e.downcast_ref::<std::io::Error>().is_some_and(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        });
        if timed_out {
            return true;
        }
        current = e.source();
    }
    false
}

/// Last path segment of a resource URI (`.../infrastructures/<id>`).
fn last_segment(uri: &str) -> Option<String> {
    uri.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn template_content_type(template: &Path) -> &'static str {
    match template.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => "text/yaml",
        Some("json") => "application/json",
        _ => "text/plain",
    }
}

impl InfrastructureBackend for ImRestBackend {
    async fn vm_info(&self, auth: &AuthContext, inf_id: &str, vm_id: &str) -> Result<Vec<VmRecord>> {
        let url = self.url(&format!("infrastructures/{inf_id}/vms/{vm_id}"));
        let body = self.get_json(auth, url).await?;
        Ok(vec![VmRecord::from_radl_json(
            Some(vm_id.to_string()),
            &body["radl"],
        )])
    }

    async fn infrastructure_info(&self, auth: &AuthContext, inf_id: &str) -> Result<Vec<VmRecord>> {
        let url = self.url(&format!("infrastructures/{inf_id}"));
        let body = self.get_json(auth, url).await?;
        let uris: Vec<String> = body["uri-list"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["uri"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut records = Vec::with_capacity(uris.len());
        for uri in uris {
            let vm_id = last_segment(&uri);
            let vm = self.get_json(auth, uri).await?;
            records.push(VmRecord::from_radl_json(vm_id, &vm["radl"]));
        }
        Ok(records)
    }

    async fn state(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        let url = self.url(&format!("infrastructures/{inf_id}/state"));
        let body = self.get_json(auth, url).await?;
        body["state"]["state"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AccessError::ExtractionMissing(Secret::State).into())
    }

    async fn contmsg(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        let url = self.url(&format!("infrastructures/{inf_id}/contmsg"));
        self.get(auth, url, "text/plain").await
    }

    async fn destroy(&self, auth: &AuthContext, inf_id: &str) -> Result<String> {
        let url = self.url(&format!("infrastructures/{inf_id}"));
        self.send(Call {
            method: "DELETE",
            url,
            accept: "text/plain",
            authorization: auth.to_header_value(),
            body: None,
        })
        .await?;
        Ok(format!("Infrastructure {inf_id} successfully destroyed"))
    }

    async fn create(&self, auth: &AuthContext, template: &Path) -> Result<String> {
        let content = std::fs::read_to_string(template)
            .with_context(|| format!("cannot read template {}", template.display()))?;
        let answer = self
            .send(Call {
                method: "POST",
                url: self.url("infrastructures"),
                accept: "application/json",
                authorization: auth.to_header_value(),
                body: Some((content, template_content_type(template))),
            })
            .await?;
        let uri = serde_json::from_str::<Value>(&answer)
            .ok()
            .and_then(|v| v["uri"].as_str().map(str::to_string))
            .unwrap_or(answer);
        last_segment(&uri).with_context(|| format!("IM did not return an infrastructure URI: {uri}"))
    }
}
