//! Integration tests for commands that only touch the catalog.
//!
//! `APRICOT_CATALOG` points at a temp file; no test reaches an IM or a
//! token endpoint.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::Command;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    fn catalog(&self) -> PathBuf {
        self.dir.path().join("infrastructuresList.json")
    }

    fn write_catalog(&self, doc: &Value) {
        std::fs::write(self.catalog(), serde_json::to_vec_pretty(doc).unwrap()).unwrap();
    }

    fn read_catalog(&self) -> Value {
        serde_json::from_slice(&std::fs::read(self.catalog()).unwrap()).unwrap()
    }

    fn apricot(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("apricot"));
        cmd.env("NO_COLOR", "1")
            .env("APRICOT_CONFIG", self.dir.path().join("config.yaml"))
            .env("APRICOT_CATALOG", self.catalog())
            .env_remove("RUST_LOG");
        cmd
    }
}

fn token_expiring_at(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"op","exp":{exp}}}"#));
    format!("{header}.{payload}.sig")
}

// ---------------------------------------------------------------------------
// `apricot list`
// ---------------------------------------------------------------------------

#[test]
fn test_list_without_catalog_is_empty() {
    let env = Env::new();
    env.apricot()
        .args(["--json", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""infrastructures": []"#));
    assert!(!env.catalog().exists(), "list must not create the catalog");
}

#[test]
fn test_list_human_empty_hint() {
    let env = Env::new();
    env.apricot()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No infrastructures registered"));
}

#[test]
fn test_corrupt_catalog_is_reported_and_left_alone() {
    let env = Env::new();
    std::fs::write(env.catalog(), b"{not json").unwrap();

    env.apricot()
        .args(["--json", "list"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""code": "corrupt_catalog""#));
    assert_eq!(std::fs::read(env.catalog()).unwrap(), b"{not json");
}

// ---------------------------------------------------------------------------
// `apricot token`
// ---------------------------------------------------------------------------

#[test]
fn test_token_status_valid_and_expired() {
    let env = Env::new();
    env.write_catalog(&json!({
        "infrastructures": [
            {
                "infrastructureID": "fresh",
                "name": "a",
                "type": "BearerToken",
                "accessToken": token_expiring_at(4_102_444_800)
            },
            {
                "infrastructureID": "stale",
                "name": "b",
                "type": "BearerToken",
                "accessToken": token_expiring_at(1_000)
            }
        ]
    }));

    env.apricot()
        .args(["--json", "token", "status", "fresh"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "valid""#))
        .stdout(predicate::str::contains("4102444800"));
    env.apricot()
        .args(["--json", "token", "status", "stale"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "expired""#));
}

#[test]
fn test_token_status_unknown_id_is_not_found() {
    let env = Env::new();
    env.write_catalog(&json!({ "infrastructures": [] }));

    env.apricot()
        .args(["--json", "token", "status", "ghost"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""code": "not_found""#));
    env.apricot()
        .args(["token", "status", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Infrastructure 'ghost' not found"));
}

#[test]
fn test_token_set_stores_tokens_and_keeps_unknown_fields() {
    let env = Env::new();
    env.write_catalog(&json!({
        "infrastructures": [
            { "infrastructureID": "inf-1", "name": "a", "type": "BearerToken", "color": "red" }
        ],
        "uiVersion": 3
    }));
    let access = token_expiring_at(4_102_444_800);

    env.apricot()
        .args([
            "token",
            "set",
            "inf-1",
            "--refresh-token",
            "r-123",
            "--access-token",
            &access,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tokens stored for inf-1"));

    let doc = env.read_catalog();
    let entry = &doc["infrastructures"][0];
    assert_eq!(entry["refreshToken"], "r-123");
    assert_eq!(entry["accessToken"], access.as_str());
    assert_eq!(entry["color"], "red");
    assert_eq!(doc["uiVersion"], 3);
}

#[test]
fn test_token_set_rejects_malformed_access_token() {
    let env = Env::new();
    env.write_catalog(&json!({
        "infrastructures": [
            { "infrastructureID": "inf-1", "name": "a", "type": "BearerToken" }
        ]
    }));
    let before = std::fs::read(env.catalog()).unwrap();

    env.apricot()
        .args([
            "--json",
            "token",
            "set",
            "inf-1",
            "--refresh-token",
            "r",
            "--access-token",
            "not-a-jwt",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""code": "token_decode""#));
    assert_eq!(std::fs::read(env.catalog()).unwrap(), before);
}

// ---------------------------------------------------------------------------
// Commands that need auth fail before any network call
// ---------------------------------------------------------------------------

#[test]
fn test_info_without_any_token_is_no_token() {
    let env = Env::new();
    env.write_catalog(&json!({
        "infrastructures": [
            { "infrastructureID": "inf-1", "name": "a", "type": "BearerToken" }
        ]
    }));

    env.apricot()
        .args(["--json", "info", "inf-1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""code": "no_token""#));
}

#[test]
fn test_destroy_unknown_id_keeps_catalog() {
    let env = Env::new();
    env.write_catalog(&json!({
        "infrastructures": [
            { "infrastructureID": "inf-1", "name": "a", "type": "BearerToken" }
        ]
    }));
    let before = std::fs::read(env.catalog()).unwrap();

    env.apricot()
        .args(["--json", "destroy", "ghost"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""code": "not_found""#));
    assert_eq!(std::fs::read(env.catalog()).unwrap(), before);
}

#[test]
fn test_static_entry_missing_im_login_is_invalid_credential_spec() {
    let env = Env::new();
    env.write_catalog(&json!({
        "infrastructures": [
            {
                "infrastructureID": "inf-1",
                "name": "a",
                "type": "EC2",
                "id": "ec2",
                "user": "AKIA",
                "pass": "secret"
            }
        ]
    }));

    env.apricot()
        .args(["--json", "log", "inf-1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""code": "invalid_credential_spec""#));
}

#[test]
fn test_unknown_provider_kind() {
    let env = Env::new();
    env.write_catalog(&json!({
        "infrastructures": [
            { "infrastructureID": "inf-1", "name": "a", "type": "Azure" }
        ]
    }));

    env.apricot()
        .args(["--json", "vms", "inf-1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""code": "unknown_provider""#));
}
