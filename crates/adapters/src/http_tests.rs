// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn base_url_trailing_slash_is_trimmed() {
    let config = HttpConfig::new("https://svc.example/");
    assert_eq!(config.url("/a/b"), "https://svc.example/a/b");
}

#[test]
fn builder_methods_set_fields() {
    let config = HttpConfig::new("http://x")
        .with_timeout(Duration::from_secs(5))
        .with_identity(Some(PathBuf::from("/tmp/id.pem")));
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.identity, Some(PathBuf::from("/tmp/id.pem")));
}

#[test]
fn build_client_without_identity() {
    assert!(build_client(&HttpConfig::new("http://x")).is_ok());
}

#[test]
fn build_client_missing_identity_file() {
    let config =
        HttpConfig::new("http://x").with_identity(Some(PathBuf::from("/nonexistent/id.pem")));
    let err = build_client(&config).unwrap_err();
    assert!(err.contains("failed to read identity"), "got: {err}");
}
