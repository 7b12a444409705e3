//! Integration tests for the `quest` binary
//!
//! Every test runs against its own data directory.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use super::common::server::{TestServer, PASSWORD, TOKEN, USER};

fn quest(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("quest").expect("quest binary");
    cmd.arg("--data-dir").arg(data_dir).env_remove("RUST_LOG");
    cmd
}

/// Run a command off the async runtime so the test server keeps serving
async fn run(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .expect("command panicked")
}

#[test]
fn test_adventure_create_and_list() {
    let dir = TempDir::new().unwrap();

    quest(dir.path())
        .args(["adventure", "create", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"api\""));

    quest(dir.path())
        .args(["adventure", "create", "api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    quest(dir.path())
        .args(["adventure", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"api\""));

    assert!(dir.path().join("quest.db").exists());
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_quest_lifecycle() {
    let dir = TempDir::new().unwrap();
    quest(dir.path()).args(["adventure", "create", "api"]).assert().success();

    quest(dir.path())
        .args([
            "create",
            "GET",
            "me",
            "http://{{host}}/me",
            "api",
            "-H",
            "Authorization: Bearer {{token}}",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bearer {{token}}"));

    quest(dir.path())
        .args(["create", "GET", "me", "http://{{host}}/other", "api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    quest(dir.path())
        .args(["bundle", "update", "api", "-i", "host: localhost"])
        .assert()
        .success();

    quest(dir.path())
        .args(["vars", "me", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("host: defined"))
        .stdout(predicate::str::contains("token: undefined"));

    quest(dir.path())
        .args(["update", "POST", "me", "http://{{host}}/me2", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/me2"));

    quest(dir.path())
        .args(["list", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"method\": \"POST\""));

    quest(dir.path())
        .args(["delete", "me", "api"])
        .assert()
        .success();

    quest(dir.path())
        .args(["vars", "me", "api"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_spell_not_saved() {
    let dir = TempDir::new().unwrap();
    quest(dir.path()).args(["adventure", "create", "api"]).assert().success();
    quest(dir.path())
        .args(["create", "GET", "ping", "http://localhost/", "api"])
        .assert()
        .success();

    let spell = dir.path().join("bad.toml");
    fs::write(&spell, "[spell]\ntoken = \"$response.cookie\"\n").unwrap();

    quest(dir.path())
        .args(["spell", "ping", "api", "--file"])
        .arg(&spell)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid spell"));

    quest(dir.path())
        .args(["list", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"spell\": null"));
}

#[test]
fn test_malformed_option() {
    let dir = TempDir::new().unwrap();
    quest(dir.path())
        .args(["bundle", "create", "api", "-i", "no-separator"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key: value"));
}

/// Render failures name their error kind on stderr
#[test]
fn test_call_reports_error_kind() {
    let dir = TempDir::new().unwrap();
    quest(dir.path()).args(["adventure", "create", "api"]).assert().success();
    quest(dir.path())
        .args(["create", "GET", "me", "http://{{host}}/me", "api"])
        .assert()
        .success();

    quest(dir.path())
        .args(["call", "me", "api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("UndefinedVariable: undefined variable `host`"));

    quest(dir.path())
        .args(["call", "nope", "api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("QuestNotFound: quest `nope` not found"));
}

#[test]
fn test_config_set_and_path() {
    let dir = TempDir::new().unwrap();

    quest(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    quest(dir.path())
        .args(["config", "set", "http.user_agent", "cli-test/9"])
        .assert()
        .success();

    let contents = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(contents.contains("cli-test/9"));

    quest(dir.path())
        .args(["config", "set", "http.nope", "1"])
        .assert()
        .failure();
}

/// The full chain through the binary: bundle, spell, call, call
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_call_chain_persists_bundle() {
    let server = TestServer::start().await;
    let dir = TempDir::new().unwrap();
    let host = format!("host: {}", server.host());
    let user = format!("user: {USER}");
    let pass = format!("pass: {PASSWORD}");

    let steps: Vec<Vec<&str>> = vec![
        vec!["adventure", "create", "api"],
        vec!["bundle", "create", "api", "-i", host.as_str(), "-i", user.as_str(), "-i", pass.as_str()],
        vec![
            "create", "POST", "login", "http://{{host}}/login", "api", "-d", "user: {{user}}",
            "-d", "pass: {{pass}}",
        ],
        vec![
            "create", "GET", "me", "http://{{host}}/me", "api", "-H",
            "Authorization: Bearer {{token}}",
        ],
    ];
    for step in steps {
        let mut cmd = quest(dir.path());
        cmd.args(step);
        run(cmd).await.success();
    }

    let spell = dir.path().join("login.toml");
    fs::write(&spell, "[spell]\ntoken = \"$response.header.X-Token\"\n").unwrap();
    let mut cmd = quest(dir.path());
    cmd.args(["spell", "login", "api", "--file"]).arg(&spell);
    run(cmd).await.success();

    let mut cmd = quest(dir.path());
    cmd.args(["call", "login", "api"]);
    run(cmd).await.success().stdout(predicate::str::contains("s-1"));

    let mut cmd = quest(dir.path());
    cmd.args(["bundle", "get", "api"]);
    run(cmd).await.success().stdout(predicate::str::contains(TOKEN));

    let mut cmd = quest(dir.path());
    cmd.args(["call", "me", "api"]);
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains(format!("\"name\":\"{USER}\"")));
}

/// A failing spell prints the body, exits non-zero and keeps the bundle
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_stops_at_spell_failure() {
    let server = TestServer::start().await;
    let dir = TempDir::new().unwrap();
    let host = format!("host: {}", server.host());

    let steps: Vec<Vec<&str>> = vec![
        vec!["adventure", "create", "api"],
        vec!["bundle", "create", "api", "-i", host.as_str(), "-i", "user: nobody", "-i", "pass: x"],
        vec![
            "create", "POST", "login", "http://{{host}}/login", "api", "-d", "user: {{user}}",
            "-d", "pass: {{pass}}",
        ],
        vec!["create", "GET", "me", "http://{{host}}/me", "api"],
    ];
    for step in steps {
        let mut cmd = quest(dir.path());
        cmd.args(step);
        run(cmd).await.success();
    }

    let spell = dir.path().join("login.toml");
    fs::write(&spell, "[spell]\ntoken = \"$response.header.X-Token\"\n").unwrap();
    let mut cmd = quest(dir.path());
    cmd.args(["spell", "login", "api", "--file"]).arg(&spell);
    run(cmd).await.success();

    let mut cmd = quest(dir.path());
    cmd.args(["adventure", "run", "api"]);
    run(cmd)
        .await
        .failure()
        .stdout(predicate::str::contains("denied"))
        .stdout(predicate::str::contains("missing token").not())
        .stderr(predicate::str::contains("TransformExecutionError"))
        .stderr(predicate::str::contains("X-Token"));

    let mut cmd = quest(dir.path());
    cmd.args(["bundle", "get", "api"]);
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("token").not());
}
