//! Remote access orchestration: material lookup, key file lifetime, ssh/scp.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use apricot_cli::application::services::auth::AuthResolver;
use apricot_cli::application::services::remote_access::{RemoteAccess, RemoteRequest};
use apricot_cli::application::services::token::TokenManager;
use apricot_cli::domain::error::{AccessError, Secret};
use apricot_cli::domain::extract::{PRIVATE_KEY_FIELD, PUBLIC_IP_FIELD, USERNAME_FIELD, VmRecord};
use apricot_cli::domain::remote::{RemoteOperation, TransferDirection};
use apricot_cli::infra::secret_file::TempKeyFiles;

use crate::mocks::{
    FixedEndpoint, KEY_PEM, MemoryCatalog, NOW, RecordingRunner, ScriptedBackend, err_output,
    ok_output, opennebula_entry, vm_with_access,
};

const TIMEOUT: Duration = Duration::from_secs(30);

fn exec(command: &[&str]) -> RemoteOperation {
    RemoteOperation::Exec {
        command: command.iter().map(|s| (*s).to_string()).collect(),
    }
}

async fn run_op(
    backend: &ScriptedBackend,
    runner: &RecordingRunner,
    operation: &RemoteOperation,
) -> anyhow::Result<std::process::Output> {
    let catalog = MemoryCatalog::with_entries(vec![opennebula_entry("inf-1")]);
    let tokens = TokenManager::new(FixedEndpoint::failing("unused"), 0);
    let resolver = AuthResolver::new(&catalog, &tokens);
    let access = RemoteAccess {
        resolver: &resolver,
        backend,
        runner,
        secrets: &TempKeyFiles,
    };
    access
        .run(&RemoteRequest {
            inf_id: "inf-1",
            vm_id: "0",
            operation,
            timeout: TIMEOUT,
            now: NOW,
        })
        .await
}

#[tokio::test]
async fn test_exec_writes_key_runs_ssh_and_removes_key() {
    let backend = ScriptedBackend {
        vm_info: vec![vm_with_access("0", "158.42.1.10")],
        ..ScriptedBackend::default()
    };
    let runner = RecordingRunner::replying(vec![Ok(ok_output(b"hello\n"))]);

    let output = run_op(&backend, &runner, &exec(&["echo", "hello"]))
        .await
        .expect("exec succeeds");

    assert_eq!(output.stdout, b"hello\n");
    let launches = runner.launches();
    assert_eq!(launches.len(), 1);
    let launch = &launches[0];
    assert_eq!(launch.program, "ssh");
    assert_eq!(launch.timeout, Some(TIMEOUT));
    assert_eq!(launch.secret_contents.as_deref(), Some(format!("{KEY_PEM}\n").as_str()));
    assert!(launch.args.contains(&"cloudadm@158.42.1.10".to_string()));
    assert_eq!(launch.args[launch.args.len() - 2..], ["echo", "hello"]);
    let key_path = launch.secret_path.as_ref().expect("key path passed with -i");
    assert!(!key_path.exists(), "key file must be gone after the call");
    assert_eq!(backend.calls(), vec!["vm_info inf-1 0"]);
}

#[tokio::test]
async fn test_non_zero_exit_is_subprocess_failure_and_key_is_removed() {
    let backend = ScriptedBackend {
        vm_info: vec![vm_with_access("0", "10.0.0.5")],
        ..ScriptedBackend::default()
    };
    let runner = RecordingRunner::replying(vec![Ok(err_output(2, b"permission denied\n"))]);

    let err = run_op(&backend, &runner, &exec(&["false"]))
        .await
        .expect_err("non-zero exit fails");

    assert_eq!(
        err.downcast_ref::<AccessError>(),
        Some(&AccessError::SubprocessFailure {
            program: "ssh".to_string(),
            code: 2,
            stderr: "permission denied".to_string(),
        })
    );
    let key_path = runner.launches()[0].secret_path.clone().expect("key path");
    assert!(!key_path.exists());
}

#[tokio::test]
async fn test_timeout_is_typed_and_key_is_removed() {
    let backend = ScriptedBackend {
        vm_info: vec![vm_with_access("0", "10.0.0.5")],
        ..ScriptedBackend::default()
    };
    let runner = RecordingRunner::timing_out();

    let err = run_op(&backend, &runner, &exec(&["sleep", "100"]))
        .await
        .expect_err("timeout fails");

    assert!(matches!(
        err.downcast_ref::<AccessError>(),
        Some(AccessError::Timeout { .. })
    ));
    let key_path = runner.launches()[0].secret_path.clone().expect("key path");
    assert!(!key_path.exists());
}

#[tokio::test]
async fn test_missing_key_fails_before_spawning() {
    let mut record = VmRecord::new(Some("0".to_string()));
    record.insert(USERNAME_FIELD, "cloudadm");
    record.insert(PUBLIC_IP_FIELD, "10.0.0.5");
    let backend = ScriptedBackend {
        vm_info: vec![record],
        ..ScriptedBackend::default()
    };
    let runner = RecordingRunner::default();

    let err = run_op(&backend, &runner, &exec(&["ls"]))
        .await
        .expect_err("no key");

    assert_eq!(
        err.downcast_ref::<AccessError>(),
        Some(&AccessError::ExtractionMissing(Secret::PrivateKey))
    );
    assert!(runner.launches().is_empty());
}

#[tokio::test]
async fn test_option_like_username_is_rejected_before_spawning() {
    let mut record = VmRecord::new(Some("0".to_string()));
    record.insert(PRIVATE_KEY_FIELD, KEY_PEM);
    record.insert(USERNAME_FIELD, "-oProxyCommand=touch /tmp/owned");
    record.insert(PUBLIC_IP_FIELD, "10.0.0.5");
    let backend = ScriptedBackend {
        vm_info: vec![record],
        ..ScriptedBackend::default()
    };
    let runner = RecordingRunner::default();

    let err = run_op(&backend, &runner, &exec(&["ls"]))
        .await
        .expect_err("unsafe user");

    assert!(matches!(
        err.downcast_ref::<AccessError>(),
        Some(AccessError::UnsafeTarget {
            field: Secret::SshUser,
            ..
        })
    ));
    assert!(runner.launches().is_empty());
}

#[tokio::test]
async fn test_incomplete_vm_info_falls_back_to_infrastructure_info() {
    let mut partial = VmRecord::new(Some("0".to_string()));
    partial.insert(apricot_cli::domain::extract::PRIVATE_KEY_FIELD, KEY_PEM);
    let backend = ScriptedBackend {
        vm_info: vec![partial],
        infrastructure_info: Some(vec![
            vm_with_access("1", "10.0.0.9"),
            vm_with_access("0", "10.0.0.5"),
        ]),
        ..ScriptedBackend::default()
    };
    let runner = RecordingRunner::default();

    run_op(&backend, &runner, &exec(&["uptime"]))
        .await
        .expect("fallback supplies user and IP");

    assert_eq!(
        backend.calls(),
        vec!["vm_info inf-1 0", "infrastructure_info inf-1"]
    );
    assert!(
        runner.launches()[0]
            .args
            .contains(&"cloudadm@10.0.0.5".to_string()),
        "records of the requested VM win"
    );
}

#[tokio::test]
async fn test_missing_ip_everywhere_names_host_ip() {
    let mut partial = VmRecord::new(Some("0".to_string()));
    partial.insert(apricot_cli::domain::extract::PRIVATE_KEY_FIELD, KEY_PEM);
    partial.insert(USERNAME_FIELD, "cloudadm");
    let backend = ScriptedBackend {
        vm_info: vec![partial],
        infrastructure_info: Some(Vec::new()),
        ..ScriptedBackend::default()
    };
    let runner = RecordingRunner::default();

    let err = run_op(&backend, &runner, &exec(&["ls"]))
        .await
        .expect_err("no address");
    assert_eq!(
        err.downcast_ref::<AccessError>(),
        Some(&AccessError::ExtractionMissing(Secret::HostIp))
    );
}

#[tokio::test]
async fn test_upload_and_download_scp_shapes() {
    let backend = ScriptedBackend {
        vm_info: vec![vm_with_access("0", "10.0.0.5")],
        ..ScriptedBackend::default()
    };
    let runner = RecordingRunner::default();

    let upload = RemoteOperation::Transfer {
        direction: TransferDirection::Upload,
        sources: vec!["a.txt".to_string(), "b.txt".to_string()],
        destination: "/home/cloudadm".to_string(),
    };
    let download = RemoteOperation::Transfer {
        direction: TransferDirection::Download,
        sources: vec!["/var/log/syslog".to_string()],
        destination: ".".to_string(),
    };
    run_op(&backend, &runner, &upload).await.expect("upload");
    run_op(&backend, &runner, &download).await.expect("download");

    let launches = runner.launches();
    assert!(launches.iter().all(|l| l.program == "scp"));
    let up = &launches[0].args;
    assert_eq!(
        up[up.len() - 3..],
        ["a.txt", "b.txt", "cloudadm@10.0.0.5:/home/cloudadm"]
    );
    let down = &launches[1].args;
    assert_eq!(down[down.len() - 2..], ["cloudadm@10.0.0.5:/var/log/syslog", "."]);
}
