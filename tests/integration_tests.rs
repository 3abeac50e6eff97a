//! Integration tests for the mdsync CLI
//! These tests run the actual binary and verify its behavior

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use common::{assert_contains_all, MockRepository};
use predicates::prelude::*;
use std::process::Output;
use tokio::process::Command;
use wiremock::MockServer;

/// Binary command isolated from the user's config file and token
fn mdsync(home: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_mdsync"));
    command
        .env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG")
        .current_dir(home.path());
    command
}

async fn run(command: &mut Command) -> Output {
    command.output().await.expect("Failed to execute mdsync")
}

/// Arguments pointing output, history and API at the test fixtures
fn sync_args(home: &TempDir, server: &MockServer) -> Vec<String> {
    vec![
        "--api-url".to_string(),
        server.uri(),
        "--access-token".to_string(),
        "test-token".to_string(),
        "--output".to_string(),
        home.child("out").path().to_string_lossy().into_owned(),
        "--history".to_string(),
        home.child("history.json").path().to_string_lossy().into_owned(),
    ]
}

#[tokio::test]
async fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = run(mdsync(&home).arg("--help")).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_contains_all(
        &stdout,
        &[
            "--access-token",
            "--repo",
            "--output",
            "--history",
            "--ignore",
            "--extension",
            "--dry-run",
            "--prune-stale",
        ],
    );
}

#[tokio::test]
async fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = run(mdsync(&home).arg("--version")).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mdsync"));
}

#[tokio::test]
async fn test_sync_writes_markdown_tree() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    let repo = MockRepository::new("owner/project")
        .with_directory("docs")
        .with_file("docs/intro.md", "i1", "# Intro\n")
        .with_file("src/main.go", "m1", "package main\n");
    repo.mount_tree(&server).await;
    repo.mount_blobs(&server, 1).await;

    let output = run(mdsync(&home)
        .args(sync_args(&home, &server))
        .args(["--repo", "https://github.com/owner/project"]))
    .await;

    assert!(output.status.success());
    home.child("out/project/docs/intro.md")
        .assert(predicate::str::diff("# Intro\n"));
    home.child("out/project/src/main.go")
        .assert(predicate::path::missing());
    let history = std::fs::read_to_string(home.child("history.json").path()).unwrap();
    assert_contains_all(&history, &["\"owner/project\"", "\"docs/intro.md\": \"i1\""]);
}

#[tokio::test]
async fn test_malformed_ignore_does_not_abort() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    let repo = MockRepository::new("owner/project").with_file("README.md", "r1", "readme\n");
    repo.mount_tree(&server).await;
    repo.mount_blobs(&server, 1).await;

    let output = run(mdsync(&home)
        .args(sync_args(&home, &server))
        .args(["--repo", "owner/project", "--ignore", "noColonHere"]))
    .await;

    assert!(output.status.success());
    home.child("out/project/README.md")
        .assert(predicate::path::exists());
}

#[tokio::test]
async fn test_ignore_skips_listed_paths() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    let repo = MockRepository::new("owner/project")
        .with_file("README.md", "r1", "readme\n")
        .with_file("CHANGELOG.md", "c1", "changes\n");
    repo.mount_tree(&server).await;
    // Only README.md gets a blob mock; a CHANGELOG.md request would fail the sync
    MockRepository::new("owner/project")
        .with_file("README.md", "r1", "readme\n")
        .mount_blobs(&server, 1)
        .await;

    let output = run(mdsync(&home)
        .args(sync_args(&home, &server))
        .args(["--repo", "owner/project", "--ignore", "owner/project:CHANGELOG.md"]))
    .await;

    assert!(output.status.success());
    home.child("out/project/README.md")
        .assert(predicate::path::exists());
    home.child("out/project/CHANGELOG.md")
        .assert(predicate::path::missing());
    let history = std::fs::read_to_string(home.child("history.json").path()).unwrap();
    assert!(!history.contains("CHANGELOG.md"));
}

#[tokio::test]
async fn test_invalid_config_file_fails() {
    let home = TempDir::new().unwrap();
    let config = home.child("broken.yml");
    config.write_str("repos: [unterminated\n").unwrap();

    let output = run(mdsync(&home).arg("--config").arg(config.path())).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse config file"));
}

#[tokio::test]
async fn test_config_file_supplies_repositories() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    let repo = MockRepository::new("owner/handbook").with_file("index.md", "h1", "hello\n");
    repo.mount_tree(&server).await;
    repo.mount_blobs(&server, 1).await;

    home.child("mdsync").create_dir_all().unwrap();
    let config = home.child("mdsync/config.yml");
    config
        .write_str(&format!(
            "access_token: test-token\napi_url: {}\nrepos:\n  - owner/handbook\noutput: {}\nhistory: {}\n",
            server.uri(),
            home.child("out").path().display(),
            home.child("history.json").path().display(),
        ))
        .unwrap();

    let output = run(&mut mdsync(&home)).await;

    assert!(output.status.success());
    home.child("out/handbook/index.md")
        .assert(predicate::str::diff("hello\n"));
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    let repo = MockRepository::new("owner/project").with_file("README.md", "r1", "readme\n");
    repo.mount_tree(&server).await;
    repo.mount_blobs(&server, 0).await;

    let output = run(mdsync(&home)
        .args(sync_args(&home, &server))
        .args(["--repo", "owner/project", "--dry-run"]))
    .await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("owner/project: README.md"));
    home.child("out").assert(predicate::path::missing());
    home.child("history.json")
        .assert(predicate::path::missing());
}
