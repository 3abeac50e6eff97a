//! Common test utilities and helpers for mdsync tests
#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mdsync::Config;

/// Temporary output and history locations for one test
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("docs")
    }

    pub fn history_path(&self) -> PathBuf {
        self.temp_dir.path().join("history.json")
    }

    /// Config pointing at `server` with output and history inside the temp dir
    pub fn config(&self, server: &MockServer, repos: &[&str]) -> Config {
        Config {
            access_token: Some("test-token".to_string()),
            repos: repos.iter().map(|r| r.to_string()).collect(),
            output: self.output_dir().to_string_lossy().into_owned(),
            history: self.history_path().to_string_lossy().into_owned(),
            api_url: server.uri(),
            ..Default::default()
        }
    }
}

/// One file served by the mock GitHub API
#[derive(Debug, Clone)]
pub struct MockFile {
    pub path: String,
    pub sha: String,
    pub content: String,
}

impl MockFile {
    pub fn new(path: &str, sha: &str, content: &str) -> Self {
        Self {
            path: path.to_string(),
            sha: sha.to_string(),
            content: content.to_string(),
        }
    }
}

/// Mock repository on the GitHub API surface used by mdsync
#[derive(Debug, Clone)]
pub struct MockRepository {
    pub full_name: String,
    pub files: Vec<MockFile>,
    pub directories: Vec<String>,
}

impl MockRepository {
    pub fn new(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            files: Vec::new(),
            directories: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: &str, sha: &str, content: &str) -> Self {
        self.files.push(MockFile::new(path, sha, content));
        self
    }

    pub fn with_directory(mut self, path: &str) -> Self {
        self.directories.push(path.to_string());
        self
    }

    fn blob_path(&self, sha: &str) -> String {
        format!("/repos/{}/git/blobs/{}", self.full_name, sha)
    }

    /// Tree listing body as returned by `git/trees/HEAD?recursive=1`
    pub fn tree_body(&self, server: &MockServer) -> Value {
        let mut tree: Vec<Value> = self
            .directories
            .iter()
            .map(|dir| json!({"path": dir, "mode": "040000", "type": "tree", "sha": "d0"}))
            .collect();

        tree.extend(self.files.iter().map(|file| {
            json!({
                "path": file.path,
                "mode": "100644",
                "type": "blob",
                "sha": file.sha,
                "size": file.content.len(),
                "url": format!("{}{}", server.uri(), self.blob_path(&file.sha)),
            })
        }));

        json!({"sha": "root", "tree": tree, "truncated": false})
    }

    /// Mount the tree listing mock
    pub async fn mount_tree(&self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{}/git/trees/HEAD", self.full_name)))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.tree_body(server)))
            .mount(server)
            .await;
    }

    /// Mount one blob mock per Markdown file, each expected to be fetched `times` times
    pub async fn mount_blobs(&self, server: &MockServer, times: u64) {
        for file in self.files.iter().filter(|f| f.path.ends_with(".md")) {
            Mock::given(method("GET"))
                .and(path(self.blob_path(&file.sha)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "sha": file.sha,
                    "encoding": "base64",
                    "content": BASE64.encode(file.content.as_bytes()),
                })))
                .expect(times)
                .mount(server)
                .await;
        }
    }
}

/// Mount a tree listing that answers with `status`
pub async fn mount_tree_error(server: &MockServer, full_name: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/git/trees/HEAD", full_name)))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(json!({"message": "Bad credentials"})),
        )
        .mount(server)
        .await;
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
