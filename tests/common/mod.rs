//! Common test utilities for integration tests
//!
//! Fixtures and helpers for writing configuration files to temporary
//! locations.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// A valid 32-byte secret
pub const SECRET: &str = "a8b7c6d5e4f3g2h1i0j9k8l7m6n5o4p3";

/// Path of a file under `tests/fixtures`
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Write `contents` to a temporary file ending in `suffix`
pub fn temp_config(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp config");
    file.flush().expect("Failed to flush temp config");
    file
}

/// Temporary YAML config
pub fn temp_yaml(contents: &str) -> NamedTempFile {
    temp_config(".yaml", contents)
}

/// Temporary `config.inc.php`-style config
pub fn temp_php(contents: &str) -> NamedTempFile {
    temp_config(".php", contents)
}

/// Minimal valid YAML with the given server entries appended
pub fn yaml_with_servers(servers: &str) -> String {
    format!("blowfish_secret: {SECRET}\nServers:\n{servers}")
}
