//! VM secret and descriptor extraction.
//!
//! Backends hand over either line-oriented RADL text (`key = 'value'`,
//! `key >= value`, VM blocks introduced by a header line, PEM blocks spanning
//! several lines) or structured `radl` JSON. Both are normalized into
//! [`VmRecord`]s here; everything downstream reads records only.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Line that opens a VM block in `getinfo` output.
pub const VM_HEADER: &str = "Info about VM with ID:";
pub const PRIVATE_KEY_FIELD: &str = "disk.0.os.credentials.private_key";
pub const USERNAME_FIELD: &str = "disk.0.os.credentials.username";
pub const PUBLIC_IP_FIELD: &str = "net_interface.1.ip";
pub const PRIVATE_IP_FIELD: &str = "net_interface.0.ip";
pub const STATE_FIELD: &str = "state";
pub const PROVIDER_FIELD: &str = "provider.type";
pub const IMAGE_FIELD: &str = "disk.0.image.url";
pub const DISK_SIZE_FIELD: &str = "disk.0.size";
pub const CPU_FIELD: &str = "cpu.count";
pub const MEMORY_FIELD: &str = "memory.size";
pub const GPU_FIELD: &str = "gpu.count";
/// Marker of the last line of a private key block.
pub const PEM_FOOTER: &str = "END RSA PRIVATE KEY";

const STATE_MARKER: &str = "The infrastructure is in state:";

#[allow(clippy::expect_used)] // compile-time constant pattern
static CREATED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ID: ([\w-]+)").expect("valid regex"));

#[allow(clippy::expect_used)] // compile-time constant pattern
static FIELD_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("valid regex"));

// ── Normalized record ─────────────────────────────────────────────────────────

/// Fields reported for one VM, regardless of the wire encoding.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct VmRecord {
    pub vm_id: Option<String>,
    fields: BTreeMap<String, String>,
}

impl VmRecord {
    #[must_use]
    pub fn new(vm_id: Option<String>) -> Self {
        Self {
            vm_id,
            fields: BTreeMap::new(),
        }
    }

    /// Record a field. The first value seen for a key wins.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(key.into()).or_insert_with(|| value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn is_empty(&self) -> bool {
        self.vm_id.is_none() && self.fields.is_empty()
    }

    /// Translate RADL text into records, one per VM block.
    ///
    /// Text before the first VM header (or text with no header at all, as
    /// printed by `getvminfo`) forms a record without an ID. A header always
    /// starts a fresh record, so fields never leak across blocks.
    #[must_use]
    pub fn parse_text(raw: &str) -> Vec<Self> {
        let mut records = Vec::new();
        let mut current = Self::default();
        let lines: Vec<&str> = raw.lines().map(str::trim).collect();
        let mut next = 0;

        while let Some(&line) = lines.get(next) {
            next += 1;
            if let Some(id) = line.strip_prefix(VM_HEADER) {
                if !current.is_empty() {
                    records.push(std::mem::take(&mut current));
                }
                current.vm_id = Some(id.trim().to_string());
                continue;
            }

            let Some((key, rhs)) = split_field(line) else {
                continue;
            };
            if key.ends_with("private_key") {
                // Without a footer the lines after the marker are parsed as fields.
                if let Some((pem, consumed)) = capture_pem(rhs, &lines[next..]) {
                    current.insert(key, pem);
                    next += consumed;
                }
                continue;
            }
            if let Some(value) = field_value(rhs) {
                current.insert(key, value);
            }
        }

        if !current.is_empty() {
            records.push(current);
        }
        records
    }

    /// Translate the structured `radl` array of the REST API. Only `system`
    /// entries describe the VM; scalar values are kept as text.
    #[must_use]
    pub fn from_radl_json(vm_id: Option<String>, radl: &Value) -> Self {
        let mut record = Self::new(vm_id);
        let Some(items) = radl.as_array() else {
            return record;
        };
        let systems = items
            .iter()
            .filter_map(Value::as_object)
            .filter(|obj| obj.get("class").and_then(Value::as_str) == Some("system"));
        for system in systems {
            for (key, value) in system {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                record.insert(key.as_str(), text);
            }
        }
        record
    }
}

impl fmt::Debug for VmRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: BTreeMap<&str, &str> = self
            .fields()
            .map(|(k, v)| {
                if k.ends_with("private_key") || k.ends_with("password") {
                    (k, "<redacted>")
                } else {
                    (k, v)
                }
            })
            .collect();
        f.debug_struct("VmRecord")
            .field("vm_id", &self.vm_id)
            .field("fields", &shown)
            .finish()
    }
}

/// Split `key = rhs` / `key >= rhs` / `key <= rhs`. Lines whose left side is
/// not a plain dotted key (RADL structure, prose) are skipped.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (lhs, rhs) = line.split_once('=')?;
    let key = lhs.trim().trim_end_matches(['>', '<']).trim();
    FIELD_KEY.is_match(key).then_some((key, rhs))
}

/// Value on the right of the operator: the text between the first pair of
/// single quotes, otherwise the first whitespace-delimited token.
fn field_value(rhs: &str) -> Option<String> {
    if let Some((_, after)) = rhs.split_once('\'') {
        let inner = after.split_once('\'').map_or(after, |(inner, _)| inner);
        return Some(inner.trim().to_string());
    }
    rhs.split_whitespace().next().map(str::to_string)
}

/// Collect a PEM block that starts on the current line and runs until the
/// line carrying [`PEM_FOOTER`], inclusive. Returns the block and how many of
/// `rest` it spans. `None` if a VM header or the end of input comes first.
fn capture_pem(rhs: &str, rest: &[&str]) -> Option<(String, usize)> {
    let first = rhs
        .split_once('\'')
        .map_or(rhs, |(_, after)| after)
        .trim();
    let mut block = vec![before_quote(first)];
    if first.contains(PEM_FOOTER) {
        return Some((block.join("\n"), 0));
    }
    for (taken, line) in rest.iter().enumerate() {
        if line.starts_with(VM_HEADER) {
            return None;
        }
        block.push(before_quote(line));
        if line.contains(PEM_FOOTER) {
            return Some((block.join("\n"), taken + 1));
        }
    }
    None
}

fn before_quote(line: &str) -> String {
    line.split_once('\'')
        .map_or(line, |(text, _)| text)
        .trim()
        .to_string()
}

// ── Secrets ───────────────────────────────────────────────────────────────────

/// Per-operation access material for one VM. Never persisted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct VmSecretBundle {
    pub private_key_pem: Option<String>,
    pub ssh_username: Option<String>,
    pub host_ip: Option<String>,
}

impl fmt::Debug for VmSecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmSecretBundle")
            .field(
                "private_key_pem",
                &self.private_key_pem.as_ref().map(|_| "<redacted>"),
            )
            .field("ssh_username", &self.ssh_username)
            .field("host_ip", &self.host_ip)
            .finish()
    }
}

impl VmSecretBundle {
    /// Fill the gaps of `self` from `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            private_key_pem: self.private_key_pem.or(other.private_key_pem),
            ssh_username: self.ssh_username.or(other.ssh_username),
            host_ip: self.host_ip.or(other.host_ip),
        }
    }
}

/// Pull key, username and address out of `records`. Records of `vm_id` are
/// consulted before any other record.
#[must_use]
pub fn extract_secrets(records: &[VmRecord], vm_id: Option<&str>) -> VmSecretBundle {
    let ordered: Vec<&VmRecord> = records
        .iter()
        .filter(|r| vm_id.is_some() && r.vm_id.as_deref() == vm_id)
        .chain(
            records
                .iter()
                .filter(|r| vm_id.is_none() || r.vm_id.as_deref() != vm_id),
        )
        .collect();
    let first = |key: &str| {
        ordered
            .iter()
            .find_map(|r| r.get(key))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    VmSecretBundle {
        private_key_pem: first(PRIVATE_KEY_FIELD),
        ssh_username: first(USERNAME_FIELD),
        host_ip: first(PUBLIC_IP_FIELD).or_else(|| first(PRIVATE_IP_FIELD)),
    }
}

// ── Descriptors ───────────────────────────────────────────────────────────────

/// Read-only summary of one VM, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmDescriptor {
    pub vm_id: String,
    pub ip: String,
    pub provider_type: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_count: Option<u32>,
}

impl VmDescriptor {
    /// Build a descriptor when every required field is present: VM ID, IP,
    /// provider, state and one of image or disk size.
    #[must_use]
    pub fn from_record(record: &VmRecord) -> Option<Self> {
        let text = |key: &str| record.get(key).filter(|v| !v.is_empty()).map(str::to_string);
        let os_image = text(IMAGE_FIELD);
        let disk_size = text(DISK_SIZE_FIELD);
        if os_image.is_none() && disk_size.is_none() {
            return None;
        }
        Some(Self {
            vm_id: record.vm_id.clone().filter(|id| !id.is_empty())?,
            ip: text(PUBLIC_IP_FIELD).or_else(|| text(PRIVATE_IP_FIELD))?,
            provider_type: text(PROVIDER_FIELD)?,
            state: text(STATE_FIELD)?,
            os_image,
            disk_size,
            cpu_count: text(CPU_FIELD).and_then(|v| v.parse().ok()),
            memory_size: text(MEMORY_FIELD),
            gpu_count: text(GPU_FIELD).and_then(|v| v.parse().ok()),
        })
    }
}

/// Descriptors of every complete VM record, in input order. Incomplete
/// records are skipped.
#[must_use]
pub fn extract_descriptors(records: &[VmRecord]) -> Vec<VmDescriptor> {
    records.iter().filter_map(VmDescriptor::from_record).collect()
}

// ── Plain-text answers ────────────────────────────────────────────────────────

/// State from a `getstate` report (`The infrastructure is in state: running`).
#[must_use]
pub fn infrastructure_state(raw: &str) -> Option<String> {
    raw.lines()
        .find(|line| line.contains(STATE_MARKER))
        .and_then(|line| line.rsplit(':').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Infrastructure ID announced by a successful `create`.
#[must_use]
pub fn created_infrastructure_id(raw: &str) -> Option<String> {
    CREATED_ID
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
