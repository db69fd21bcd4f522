//! End-to-end tests for the `copilot-usage` binary.
//!
//! Every invocation points the config and settings files into a fresh
//! temporary directory.

mod common;

use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use copilot_usage::test_utils::{TestDir, make_test_usage_body};

use common::fixtures::{CONFIG_FILE, SETTINGS_FILE, app, settings_json};
use common::logger::TestLogger;

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// =============================================================================
// General
// =============================================================================

#[test]
fn help_lists_commands() {
    let dir = TestDir::new();
    app(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("endpoint"))
        .stdout(predicate::str::contains("backend"));
}

#[test]
fn malformed_config_exits_with_parse_error() {
    let dir = TestDir::new();
    dir.create_file(CONFIG_FILE, "[general\nrefresh_interval_seconds = ");

    app(&dir)
        .args(["endpoint", "show"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("CUS-C002"));
}

#[test]
fn out_of_range_timeout_is_rejected() {
    let dir = TestDir::new();
    app(&dir)
        .args(["--timeout", "0", "endpoint", "show"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("CUS-C001"));
}

// =============================================================================
// Endpoint
// =============================================================================

#[test]
fn endpoint_show_defaults() {
    let log = TestLogger::new("endpoint_show_defaults");
    let dir = TestDir::new();

    app(&dir)
        .args(["endpoint", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Endpoint: http://localhost:4141/usage \
             (fallback http://127.0.0.1:4141/usage) [default]",
        ));

    assert!(dir.read_file(SETTINGS_FILE).is_none(), "show never writes");
    log.finish_ok();
}

#[test]
fn endpoint_show_json() {
    let dir = TestDir::new();
    dir.create_file(SETTINGS_FILE, &settings_json("http://example.com:9000/usage"));

    let output = app(&dir)
        .args(["endpoint", "show", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["command"], "endpoint");
    assert_eq!(json["data"]["endpoint"], "http://example.com:9000/usage");
    assert_eq!(json["data"]["isDefault"], false);
    assert!(json["data"].get("fallback").is_none());
}

#[test]
fn endpoint_set_rejects_blank_input() {
    let dir = TestDir::new();

    app(&dir)
        .args(["endpoint", "set", "   "])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("CUS-U001"));

    assert!(dir.read_file(SETTINGS_FILE).is_none());
}

#[test]
fn endpoint_set_rejects_missing_host_as_json() {
    let dir = TestDir::new();

    let output = app(&dir)
        .args(["--json", "endpoint", "set", "http://"])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim().lines().count(), 1, "{stderr}");
    let err: serde_json::Value = serde_json::from_str(&stderr).expect("stderr is JSON");
    assert!(
        err["error_code"].as_str().is_some_and(|code| code.starts_with("CUS-U")),
        "{err}"
    );
    assert_eq!(err["category"], "Endpoint error");
}

#[test]
fn endpoint_set_persists_even_when_unreachable() {
    let log = TestLogger::new("endpoint_set_persists_even_when_unreachable");
    log.phase("setup");
    let dir = TestDir::new();
    let port = closed_port();

    log.phase("execute");
    app(&dir)
        .args(["--timeout", "2", "endpoint", "set", &format!("127.0.0.1:{port}")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Endpoint updated."))
        .stdout(predicate::str::contains("Test: Failed:"));

    log.phase("verify");
    let stored = dir.read_file(SETTINGS_FILE).expect("settings written");
    assert!(stored.contains(&format!("http://127.0.0.1:{port}/usage")), "{stored}");
    log.finish_ok();
}

#[test]
fn endpoint_set_same_value_is_unchanged() {
    let dir = TestDir::new();

    app(&dir)
        .args(["endpoint", "set", "localhost:4141"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Endpoint unchanged."))
        .stdout(predicate::str::contains("Test:").not());

    assert!(dir.read_file(SETTINGS_FILE).is_none());
}

#[test]
fn endpoint_reset_restores_default() {
    let dir = TestDir::new();
    let stored = format!("http://127.0.0.1:{}/usage", closed_port());
    dir.create_file(SETTINGS_FILE, &settings_json(&stored));

    app(&dir)
        .args(["--timeout", "1", "endpoint", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[default]"));

    let stored = dir.read_file(SETTINGS_FILE).expect("settings written");
    assert!(stored.contains("http://localhost:4141/usage"), "{stored}");
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn status_reports_usage_from_stored_endpoint() {
    let log = TestLogger::new("status_reports_usage_from_stored_endpoint");
    log.phase("setup");
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(make_test_usage_body(10, 50)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TestDir::new();
    dir.create_file(SETTINGS_FILE, &settings_json(&server.uri()));

    log.phase("execute");
    log.http_request("GET", &format!("{}/usage", server.uri()));
    let output = app(&dir).args(["status", "--json"]).output().expect("run");

    log.phase("verify");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["command"], "status");
    assert_eq!(json["data"]["menuTitle"], "10/50");
    assert_eq!(json["data"]["remaining"], 40);
    assert_eq!(json["data"]["state"]["status"], "loaded");
    log.finish_ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn status_human_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(make_test_usage_body(5, 20)))
        .mount(&server)
        .await;

    let dir = TestDir::new();
    dir.create_file(SETTINGS_FILE, &settings_json(&server.uri()));

    app(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Copilot premium interactions"))
        .stdout(predicate::str::contains("5/20 used, 15 remaining"));
}

#[tokio::test(flavor = "multi_thread")]
async fn status_http_error_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TestDir::new();
    dir.create_file(SETTINGS_FILE, &settings_json(&server.uri()));

    app(&dir)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CUS-R001"))
        .stderr(predicate::str::contains("copilot-usage endpoint show"));
}

#[test]
fn status_unreachable_reports_connectivity() {
    let dir = TestDir::new();
    dir.create_file(SETTINGS_FILE, &settings_json(&format!("http://127.0.0.1:{}", closed_port())));

    app(&dir)
        .args(["--timeout", "2", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CUS-N"));
}
