//! IM command-line backend: auth file handling, argument shape, parsing.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use apricot_cli::application::InfrastructureBackend;
use apricot_cli::domain::credential::AuthContext;
use apricot_cli::domain::error::AccessError;
use apricot_cli::infra::im_cli::ImCliBackend;

use crate::mocks::{RecordingRunner, err_output, ok_output};

const ENDPOINT: &str = "https://im.example/im";

fn backend(runner: &RecordingRunner) -> ImCliBackend<&RecordingRunner> {
    ImCliBackend::new(
        runner,
        "im_client.py".to_string(),
        ENDPOINT.to_string(),
        Duration::from_secs(120),
    )
}

fn auth() -> AuthContext {
    AuthContext::for_token("tok-123")
}

#[tokio::test]
async fn test_state_call_shape_and_auth_file_lifetime() {
    let runner = RecordingRunner::replying(vec![Ok(ok_output(
        b"The infrastructure is in state: configured\n",
    ))]);

    let state = backend(&runner)
        .state(&auth(), "inf-1")
        .await
        .expect("state");

    assert_eq!(state, "configured");
    let launch = &runner.launches()[0];
    assert_eq!(launch.program, "im_client.py");
    assert_eq!(launch.args[0], "-a");
    assert_eq!(launch.args[2..], ["-r", ENDPOINT, "getstate", "inf-1"]);
    assert_eq!(launch.timeout, Some(Duration::from_secs(120)));
    assert_eq!(
        launch.secret_contents.as_deref(),
        Some(auth().to_file_contents().as_str())
    );
    assert!(!launch.secret_path.as_ref().unwrap().exists());
}

#[tokio::test]
async fn test_failure_reports_stdout_when_stderr_is_empty() {
    let mut output = err_output(1, b"");
    output.stdout = b"Error getting infrastructure: not found\n".to_vec();
    let runner = RecordingRunner::replying(vec![Ok(output)]);

    let err = backend(&runner)
        .contmsg(&auth(), "inf-1")
        .await
        .expect_err("non-zero exit");

    assert_eq!(
        err.downcast_ref::<AccessError>(),
        Some(&AccessError::SubprocessFailure {
            program: "im_client.py".to_string(),
            code: 1,
            stderr: "Error getting infrastructure: not found".to_string(),
        })
    );
    assert!(!runner.launches()[0].secret_path.as_ref().unwrap().exists());
}

#[tokio::test]
async fn test_getinfo_text_becomes_records() {
    let raw = "\
Info about VM with ID: 0
system front (
 net_interface.1.ip = '158.42.1.10' and
 disk.0.os.credentials.username = 'cloudadm' and
 state = 'configured'
)
Info about VM with ID: 1
system wn (
 net_interface.0.ip = '10.0.0.2' and
 state = 'running'
)
";
    let runner = RecordingRunner::replying(vec![Ok(ok_output(raw.as_bytes()))]);

    let records = backend(&runner)
        .infrastructure_info(&auth(), "inf-1")
        .await
        .expect("info");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].vm_id.as_deref(), Some("0"));
    assert_eq!(records[0].get("net_interface.1.ip"), Some("158.42.1.10"));
    assert_eq!(records[1].get("state"), Some("running"));
    assert_eq!(runner.launches()[0].args[4..], ["getinfo", "inf-1"]);
}

#[tokio::test]
async fn test_vm_info_fills_in_requested_vm_id() {
    let raw = "system front (\n disk.0.os.credentials.username = 'ubuntu'\n)\n";
    let runner = RecordingRunner::replying(vec![Ok(ok_output(raw.as_bytes()))]);

    let records = backend(&runner)
        .vm_info(&auth(), "inf-1", "3")
        .await
        .expect("vm info");

    assert_eq!(records[0].vm_id.as_deref(), Some("3"));
    assert_eq!(runner.launches()[0].args[4..], ["getvminfo", "inf-1", "3"]);
}

#[tokio::test]
async fn test_create_reads_new_id() {
    let runner = RecordingRunner::replying(vec![Ok(ok_output(
        b"Infrastructure successfully created with ID: 4f1a-77b2\n",
    ))]);

    let id = backend(&runner)
        .create(&auth(), std::path::Path::new("/tmp/front.radl"))
        .await
        .expect("create");

    assert_eq!(id, "4f1a-77b2");
    assert_eq!(
        runner.launches()[0].args[4..],
        ["create", "/tmp/front.radl"]
    );
}

#[tokio::test]
async fn test_create_without_id_is_an_error() {
    let runner = RecordingRunner::replying(vec![Ok(ok_output(b"something odd\n"))]);

    assert!(
        backend(&runner)
            .create(&auth(), std::path::Path::new("t.radl"))
            .await
            .is_err()
    );
}
