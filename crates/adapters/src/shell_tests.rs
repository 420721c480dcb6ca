// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

fn shell_for(toml: &str) -> ConfigShell {
    ConfigShell::new(&Config::from_toml(Path::new("rollback.toml"), toml).unwrap())
}

const CONFIG: &str = r#"
[environments.staging.operations]
liveness = "echo alive-$RB_ENVIRONMENT"
smoke-test = "echo smoke failed >&2; exit 4"
apply-marker = "echo marker=$RB_MARKER"
"#;

#[tokio::test]
async fn runs_configured_operation_with_environment() {
    let shell = shell_for(CONFIG);
    let output = shell.run(OperationRequest::new("staging", operations::LIVENESS)).await.unwrap();
    assert!(output.success());
    assert_eq!(output.stdout.trim(), "alive-staging");
}

#[tokio::test]
async fn exports_request_vars() {
    let shell = shell_for(CONFIG);
    let request = OperationRequest::new("staging", operations::APPLY_MARKER).var("RB_MARKER", "v2");
    let output = shell.run(request).await.unwrap();
    assert_eq!(output.into_result("apply-marker").unwrap(), "marker=v2");
}

#[tokio::test]
async fn non_zero_exit_is_reported_in_output() {
    let shell = shell_for(CONFIG);
    let output = shell.run(OperationRequest::new("staging", operations::SMOKE_TEST)).await.unwrap();

    assert_eq!(output.exit_code, 4);
    let err = output.into_result("smoke-test").unwrap_err();
    assert_eq!(err.to_string(), "smoke-test exited with code 4: smoke failed");
}

#[tokio::test]
async fn missing_operation_is_not_configured() {
    let shell = shell_for(CONFIG);
    let request = OperationRequest::new("staging", operations::STOP_SERVICES);
    let err = shell.run(request).await.unwrap_err();
    assert!(err.is_not_configured());
}

#[tokio::test]
async fn unknown_environment_is_rejected() {
    let shell = shell_for(CONFIG);
    let err = shell.run(OperationRequest::new("qa", operations::LIVENESS)).await.unwrap_err();
    assert!(matches!(err, AdapterError::UnknownEnvironment(ref e) if e == "qa"));
}

#[tokio::test]
async fn runs_in_repo_directory() {
    let dir = tempfile::tempdir().unwrap();
    let toml = format!(
        concat!(
            "[environments.staging]\nrepo = {:?}\n",
            "[environments.staging.operations]\nliveness = \"pwd\"\n",
        ),
        dir.path()
    );
    let shell = shell_for(&toml);
    let output = shell.run(OperationRequest::new("staging", "liveness")).await.unwrap();
    let pwd = std::fs::canonicalize(output.stdout.trim()).unwrap();
    assert_eq!(pwd, std::fs::canonicalize(dir.path()).unwrap());
}

#[yare::parameterized(
    environment_ping = { operations::ENVIRONMENT_PING },
    smoke_test       = { operations::SMOKE_TEST },
    release_version  = { operations::RELEASE_VERSION },
)]
fn operation_names_are_known(name: &str) {
    assert!(operations::ALL.contains(&name));
}

#[tokio::test]
async fn fake_records_calls_and_injected_failures() {
    let shell = FakeShell::new();
    shell.fail(operations::LIVENESS, "connection refused");
    shell.set_stdout(operations::RELEASE_VERSION, "2.4.0\n");

    let live = shell.run(OperationRequest::new("prod", operations::LIVENESS)).await.unwrap();
    let version =
        shell.run(OperationRequest::new("prod", operations::RELEASE_VERSION)).await.unwrap();

    assert!(!live.success());
    assert_eq!(version.into_result("release-version").unwrap(), "2.4.0");
    assert_eq!(shell.operations(), vec!["liveness", "release-version"]);
}

#[tokio::test]
async fn fake_hold_blocks_until_released() {
    let shell = FakeShell::new();
    shell.hold(operations::STOP_SERVICES);

    let task = {
        let shell = shell.clone();
        tokio::spawn(async move {
            shell.run(OperationRequest::new("prod", operations::STOP_SERVICES)).await
        })
    };
    shell.entered(operations::STOP_SERVICES).await;
    assert!(!task.is_finished());

    shell.release(operations::STOP_SERVICES);
    assert!(task.await.unwrap().unwrap().success());
}
