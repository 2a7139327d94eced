//! Wire format of the infrastructure catalog (`infrastructuresList.json`).
//!
//! The document is shared with other front-ends, so field names follow the
//! established camelCase layout and any field this crate does not model is
//! carried through untouched in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Raised when catalog bytes are not a valid catalog document.
#[derive(Debug, Error)]
#[error("invalid catalog document: {0}")]
pub struct CatalogFormatError(#[from] serde_json::Error);

/// The whole catalog file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub infrastructures: Vec<CatalogEntry>,

    /// Access token shared by every entry that has none of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Refresh token shared by every entry that has none of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One known infrastructure with the credential material needed to reach it.
///
/// Which provider fields are required depends on `kind`; that check belongs
/// to the consumer, this type only mirrors what is on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "infrastructureID")]
    pub infrastructure_id: String,

    #[serde(default)]
    pub name: String,

    /// Provider kind: `OpenStack`, `OpenNebula`, `EC2`, `EGI` or `BearerToken`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Identifier of the provider clause in the authentication line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    #[serde(rename = "authVersion", default, skip_serializing_if = "Option::is_none")]
    pub auth_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vo: Option<String>,

    #[serde(rename = "EGIToken", default, skip_serializing_if = "Option::is_none")]
    pub egi_token: Option<String>,

    #[serde(rename = "IMuser", default, skip_serializing_if = "Option::is_none")]
    pub im_user: Option<String>,

    #[serde(rename = "IMpass", default, skip_serializing_if = "Option::is_none")]
    pub im_pass: Option<String>,

    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogDocument {
    /// Parse a catalog from raw bytes. Empty input is an empty catalog.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CatalogFormatError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize with four-space indentation, matching files written by
    /// the notebook front-end.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, CatalogFormatError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }

    #[must_use]
    pub fn find(&self, infrastructure_id: &str) -> Option<&CatalogEntry> {
        self.infrastructures
            .iter()
            .find(|e| e.infrastructure_id == infrastructure_id)
    }

    /// Entry with token fields resolved: the entry's own tokens win, the
    /// document-level ones fill the gaps.
    #[must_use]
    pub fn effective_entry(&self, infrastructure_id: &str) -> Option<CatalogEntry> {
        let mut entry = self.find(infrastructure_id)?.clone();
        if entry.access_token.is_none() {
            entry.access_token.clone_from(&self.access_token);
        }
        if entry.refresh_token.is_none() {
            entry.refresh_token.clone_from(&self.refresh_token);
        }
        Some(entry)
    }

    /// Insert `entry`, replacing any entry with the same ID in place.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub fn upsert(&mut self, entry: CatalogEntry) -> bool {
        match self
            .infrastructures
            .iter_mut()
            .find(|e| e.infrastructure_id == entry.infrastructure_id)
        {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => {
                self.infrastructures.push(entry);
                false
            }
        }
    }

    /// Remove the entry with the given ID, if present.
    pub fn remove(&mut self, infrastructure_id: &str) -> Option<CatalogEntry> {
        let pos = self
            .infrastructures
            .iter()
            .position(|e| e.infrastructure_id == infrastructure_id)?;
        Some(self.infrastructures.remove(pos))
    }

    /// Store a new access token in the slot it was read from.
    ///
    /// Returns `false` when no entry has the given ID.
    pub fn set_access_token(&mut self, infrastructure_id: &str, token: &str) -> bool {
        let shared = &mut self.access_token;
        let Some(entry) = self
            .infrastructures
            .iter_mut()
            .find(|e| e.infrastructure_id == infrastructure_id)
        else {
            return false;
        };
        match entry.access_token.as_mut() {
            Some(own) => token.clone_into(own),
            None => *shared = Some(token.to_string()),
        }
        true
    }
}
