//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::path::Path;

use mirror_sync::config::SyncConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Write a file below `root`, creating parent directories
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create directory");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

/// Write a public package manifest at `rel_dir/package.json`
pub fn write_manifest(root: &Path, rel_dir: &str, name: &str) {
    let rel = if rel_dir.is_empty() {
        "package.json".to_string()
    } else {
        format!("{}/package.json", rel_dir)
    };
    write_file(
        root,
        &rel,
        &format!(r#"{{ "name": "{}", "version": "1.0.0" }}"#, name),
    );
}

/// Sync configuration pointing at a mock mirror with fast retries
pub fn mock_sync_config(server: &MockServer) -> SyncConfig {
    SyncConfig {
        registry: Some(server.uri()),
        timeout_ms: 2_000,
        retry_delay_ms: 1,
        ..SyncConfig::for_target("npmmirror")
    }
}

/// Mount a sync endpoint for `package` answering with `status`
pub async fn mount_sync(server: &MockServer, package: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("/{}/sync_upstream=true", package)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Number of sync requests the mock mirror received for `package`
pub async fn sync_requests(server: &MockServer, package: &str) -> usize {
    let expected = format!("/{}/sync_upstream=true", package);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == expected)
        .count()
}
