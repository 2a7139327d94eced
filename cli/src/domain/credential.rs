//! Credential model and authentication-line rendering.
//!
//! The Infrastructure Manager parses each auth line as positionally ordered
//! `key = value` clauses separated by `;`, so clause order per provider is
//! fixed here and nowhere else.

use std::fmt;

use apricot_common::CatalogEntry;

use crate::domain::error::AuthError;

/// Value of the `type` clause that addresses the Infrastructure Manager itself.
pub const IM_KIND: &str = "InfrastructureManager";

/// Username/password pair for the Infrastructure Manager.
#[derive(Clone, PartialEq, Eq)]
pub struct ImLogin {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ImLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImLogin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Provider credentials of one infrastructure. Exactly one variant per record.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSpec {
    OpenStack {
        id: String,
        username: String,
        password: String,
        host: String,
        tenant: String,
        auth_version: Option<String>,
        domain: String,
    },
    OpenNebula {
        id: String,
        username: String,
        password: String,
        host: String,
    },
    Ec2 {
        id: String,
        username: String,
        password: String,
    },
    Egi {
        id: String,
        host: String,
        vo: String,
        token: String,
    },
    /// Token-only access: the IM is reached with a bearer token that may
    /// need refreshing before use.
    BearerToken { token: Option<String> },
}

impl CredentialSpec {
    /// Catalog `type` string of this variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OpenStack { .. } => "OpenStack",
            Self::OpenNebula { .. } => "OpenNebula",
            Self::Ec2 { .. } => "EC2",
            Self::Egi { .. } => "EGI",
            Self::BearerToken { .. } => "BearerToken",
        }
    }

    /// Provider clause of the auth document, `None` for token-only access.
    #[must_use]
    pub fn provider_line(&self) -> Option<String> {
        let kind = self.kind();
        let pairs: Vec<(&str, &str)> = match self {
            Self::OpenStack {
                id,
                username,
                password,
                host,
                tenant,
                auth_version,
                domain,
            } => {
                let mut pairs = vec![
                    ("id", id.as_str()),
                    ("type", kind),
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                    ("host", host.as_str()),
                    ("tenant", tenant.as_str()),
                ];
                if let Some(version) = auth_version {
                    pairs.push(("auth_version", version.as_str()));
                }
                pairs.push(("domain", domain.as_str()));
                pairs
            }
            Self::OpenNebula {
                id,
                username,
                password,
                host,
            } => vec![
                ("id", id.as_str()),
                ("type", kind),
                ("username", username.as_str()),
                ("password", password.as_str()),
                ("host", host.as_str()),
            ],
            Self::Ec2 {
                id,
                username,
                password,
            } => vec![
                ("id", id.as_str()),
                ("type", kind),
                ("username", username.as_str()),
                ("password", password.as_str()),
            ],
            Self::Egi { id, host, vo, token } => vec![
                ("id", id.as_str()),
                ("type", kind),
                ("host", host.as_str()),
                ("vo", vo.as_str()),
                ("token", token.as_str()),
            ],
            Self::BearerToken { .. } => return None,
        };
        Some(clauses(&pairs))
    }
}

impl fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialSpec::{}(<redacted>)", self.kind())
    }
}

/// Validated, typed view of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureRecord {
    pub infrastructure_id: String,
    pub name: String,
    pub credential: CredentialSpec,
    /// Required for every static provider kind.
    pub im_login: Option<ImLogin>,
    pub refresh_token: Option<String>,
}

impl TryFrom<&CatalogEntry> for InfrastructureRecord {
    type Error = AuthError;

    fn try_from(entry: &CatalogEntry) -> Result<Self, Self::Error> {
        let id = entry.infrastructure_id.as_str();
        let field = |value: &Option<String>, name: &'static str| required(id, value, name);

        let kind = field(&entry.kind, "type")?;
        let credential = match kind.as_str() {
            "OpenStack" => CredentialSpec::OpenStack {
                id: field(&entry.id, "id")?,
                username: field(&entry.user, "user")?,
                password: field(&entry.pass, "pass")?,
                host: field(&entry.host, "host")?,
                tenant: field(&entry.tenant, "tenant")?,
                auth_version: non_empty(&entry.auth_version),
                domain: field(&entry.domain, "domain")?,
            },
            "OpenNebula" => CredentialSpec::OpenNebula {
                id: field(&entry.id, "id")?,
                username: field(&entry.user, "user")?,
                password: field(&entry.pass, "pass")?,
                host: field(&entry.host, "host")?,
            },
            "EC2" => CredentialSpec::Ec2 {
                id: field(&entry.id, "id")?,
                username: field(&entry.user, "user")?,
                password: field(&entry.pass, "pass")?,
            },
            "EGI" => CredentialSpec::Egi {
                id: field(&entry.id, "id")?,
                host: field(&entry.host, "host")?,
                vo: field(&entry.vo, "vo")?,
                token: field(&entry.egi_token, "EGIToken")?,
            },
            "BearerToken" => CredentialSpec::BearerToken {
                token: non_empty(&entry.access_token),
            },
            other => {
                return Err(AuthError::UnknownProvider {
                    id: id.to_string(),
                    kind: other.to_string(),
                });
            }
        };

        let im_login = match credential {
            CredentialSpec::BearerToken { .. } => None,
            _ => Some(ImLogin {
                username: field(&entry.im_user, "IMuser")?,
                password: field(&entry.im_pass, "IMpass")?,
            }),
        };

        Ok(Self {
            infrastructure_id: id.to_string(),
            name: entry.name.clone(),
            credential,
            im_login,
            refresh_token: non_empty(&entry.refresh_token),
        })
    }
}

/// Rendered authentication document, one clause line per service.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    lines: Vec<String>,
}

impl AuthContext {
    /// Auth document for a static-provider record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentialSpec` if the record has no IM login or is
    /// token-only.
    pub fn for_static(record: &InfrastructureRecord) -> Result<Self, AuthError> {
        let invalid = |field| AuthError::InvalidCredentialSpec {
            id: record.infrastructure_id.clone(),
            field,
        };
        let im = record.im_login.as_ref().ok_or_else(|| invalid("IMuser"))?;
        let provider = record.credential.provider_line().ok_or_else(|| invalid("type"))?;
        let im_line = format!(
            "{};",
            clauses(&[
                ("type", IM_KIND),
                ("username", &im.username),
                ("password", &im.password),
            ])
        );
        Ok(Self {
            lines: vec![im_line, provider],
        })
    }

    /// Auth document that authenticates with a bearer token.
    #[must_use]
    pub fn for_token(token: &str) -> Self {
        Self {
            lines: vec![clauses(&[("type", IM_KIND), ("token", token)])],
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Contents of an auth file for the IM command-line client.
    #[must_use]
    pub fn to_file_contents(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Value of the `Authorization` header for the IM REST API, which takes
    /// the lines separated by a literal `\n`.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        self.lines.join("\\n")
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthContext(<{} redacted lines>)", self.lines.len())
    }
}

fn clauses(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k} = {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(id: &str, value: &Option<String>, field: &'static str) -> Result<String, AuthError> {
    non_empty(value).ok_or_else(|| AuthError::InvalidCredentialSpec {
        id: id.to_string(),
        field,
    })
}
