//! Inventory use cases: list, vms, log, destroy, create.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;

use apricot_cli::application::services::auth::AuthResolver;
use apricot_cli::application::services::inventory::{self, CreateRequest, UNAVAILABLE};
use apricot_cli::application::services::token::TokenManager;
use apricot_cli::domain::extract::{
    DISK_SIZE_FIELD, PROVIDER_FIELD, STATE_FIELD, VmRecord,
};
use apricot_common::catalog::CatalogEntry;

use crate::mocks::{
    FixedEndpoint, MemoryCatalog, NOW, ScriptedBackend, bearer_entry, opennebula_entry,
    token_expiring_at, vm_with_access,
};

fn manager() -> TokenManager<FixedEndpoint> {
    TokenManager::new(FixedEndpoint::failing("unused"), 0)
}

#[tokio::test]
async fn test_list_keeps_catalog_order_and_marks_failures() {
    let catalog = MemoryCatalog::with_entries(vec![
        opennebula_entry("inf-a"),
        bearer_entry("inf-b", None, None),
        opennebula_entry("inf-c"),
    ]);
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);
    let backend = ScriptedBackend {
        state: Some("configured".to_string()),
        infrastructure_info: Some(vec![vm_with_access("0", "158.42.1.10")]),
        ..ScriptedBackend::default()
    };

    let rows = inventory::list(&resolver, &backend, NOW).await.expect("list");

    let ids: Vec<&str> = rows.iter().map(|r| r.infrastructure_id.as_str()).collect();
    assert_eq!(ids, ["inf-a", "inf-b", "inf-c"]);
    assert_eq!(rows[0].state, "configured");
    assert_eq!(rows[0].ip, "158.42.1.10");
    assert_eq!(rows[0].name, "inf-a-name");
    assert_eq!(rows[1].state, UNAVAILABLE);
    assert_eq!(rows[1].ip, UNAVAILABLE);
    assert_eq!(rows[2].state, "configured");
}

#[tokio::test]
async fn test_list_marks_backend_failures_per_column() {
    let catalog = MemoryCatalog::with_entries(vec![opennebula_entry("inf-a")]);
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);
    let backend = ScriptedBackend {
        state: Some("running".to_string()),
        infrastructure_info: None,
        ..ScriptedBackend::default()
    };

    let rows = inventory::list(&resolver, &backend, NOW).await.expect("list");

    assert_eq!(rows[0].state, "running");
    assert_eq!(rows[0].ip, UNAVAILABLE);
}

#[tokio::test]
async fn test_list_of_empty_catalog_is_empty() {
    let catalog = MemoryCatalog::default();
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);

    let rows = inventory::list(&resolver, &ScriptedBackend::default(), NOW)
        .await
        .expect("list");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_vms_keeps_only_complete_descriptors() {
    let catalog = MemoryCatalog::with_entries(vec![opennebula_entry("inf-a")]);
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);
    let mut complete = vm_with_access("0", "158.42.1.10");
    complete.insert(PROVIDER_FIELD, "OpenNebula");
    complete.insert(STATE_FIELD, "configured");
    complete.insert(DISK_SIZE_FIELD, "20G");
    let incomplete = VmRecord::new(Some("1".to_string()));
    let backend = ScriptedBackend {
        infrastructure_info: Some(vec![complete, incomplete]),
        ..ScriptedBackend::default()
    };

    let vms = inventory::vms(&resolver, &backend, "inf-a", NOW)
        .await
        .expect("vms");

    assert_eq!(vms.len(), 1);
    assert_eq!(vms[0].vm_id, "0");
    assert_eq!(vms[0].disk_size.as_deref(), Some("20G"));
}

#[tokio::test]
async fn test_log_returns_contmsg() {
    let catalog = MemoryCatalog::with_entries(vec![opennebula_entry("inf-a")]);
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);
    let backend = ScriptedBackend {
        contmsg: Some("Contextualization finished\n".to_string()),
        ..ScriptedBackend::default()
    };

    let log = inventory::log(&resolver, &backend, "inf-a", NOW)
        .await
        .expect("log");
    assert_eq!(log, "Contextualization finished\n");
}

#[tokio::test]
async fn test_destroy_removes_entry_after_backend_accepts() {
    let catalog =
        MemoryCatalog::with_entries(vec![opennebula_entry("inf-a"), opennebula_entry("inf-b")]);
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);
    let backend = ScriptedBackend::default();

    inventory::destroy(&resolver, &backend, "inf-a", NOW)
        .await
        .expect("destroy");

    assert!(catalog.entry("inf-a").is_none());
    assert!(catalog.entry("inf-b").is_some());
    assert_eq!(backend.calls(), vec!["destroy inf-a"]);
}

#[tokio::test]
async fn test_destroy_failure_keeps_entry() {
    let catalog = MemoryCatalog::with_entries(vec![opennebula_entry("inf-a")]);
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);
    let backend = ScriptedBackend {
        destroy_fails: true,
        ..ScriptedBackend::default()
    };

    assert!(
        inventory::destroy(&resolver, &backend, "inf-a", NOW)
            .await
            .is_err()
    );
    assert!(catalog.entry("inf-a").is_some());
    assert_eq!(catalog.commits.get(), 0);
}

fn credentials() -> CatalogEntry {
    let mut entry = opennebula_entry("");
    entry.name = String::new();
    entry
}

#[tokio::test]
async fn test_create_records_new_infrastructure() {
    let catalog = MemoryCatalog::default();
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);
    let backend = ScriptedBackend {
        created_id: Some("new-id".to_string()),
        ..ScriptedBackend::default()
    };

    let id = inventory::create(
        &resolver,
        &backend,
        CreateRequest {
            template: Path::new("front.radl"),
            name: "front",
            credentials: credentials(),
            now: NOW,
        },
    )
    .await
    .expect("create");

    assert_eq!(id, "new-id");
    let entry = catalog.entry("new-id").expect("recorded");
    assert_eq!(entry.name, "front");
    assert_eq!(entry.kind.as_deref(), Some("OpenNebula"));
    assert_eq!(backend.calls(), vec!["create front.radl"]);
}

#[tokio::test]
async fn test_create_failure_writes_nothing() {
    let catalog = MemoryCatalog::default();
    let tokens = manager();
    let resolver = AuthResolver::new(&catalog, &tokens);
    let backend = ScriptedBackend::default();

    let result = inventory::create(
        &resolver,
        &backend,
        CreateRequest {
            template: Path::new("front.radl"),
            name: "front",
            credentials: credentials(),
            now: NOW,
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(catalog.commits.get(), 0);
}

#[tokio::test]
async fn test_create_with_refreshed_shared_token_stores_it() {
    let catalog = MemoryCatalog::default();
    catalog.doc.borrow_mut().refresh_token = Some("shared-refresh".to_string());
    let fresh = token_expiring_at(NOW + 3600);
    let tokens = TokenManager::new(FixedEndpoint::returning(fresh.clone()), 0);
    let resolver = AuthResolver::new(&catalog, &tokens);
    let backend = ScriptedBackend {
        created_id: Some("tok-id".to_string()),
        ..ScriptedBackend::default()
    };

    inventory::create(
        &resolver,
        &backend,
        CreateRequest {
            template: Path::new("front.yaml"),
            name: "front",
            credentials: bearer_entry("", None, None),
            now: NOW,
        },
    )
    .await
    .expect("create");

    assert!(backend.auths.borrow()[0].contains(&fresh));
    let doc = catalog.doc.borrow();
    assert_eq!(doc.access_token.as_deref(), Some(fresh.as_str()));
    assert!(doc.find("tok-id").is_some());
}
