//! Configuration files on disk

#![allow(clippy::unwrap_used)]

use assert_matches::assert_matches;
use std::path::PathBuf;
use tether_core::{TetherConfig, TetherError};

const DEPLOYMENT: &str = r#"
[topology]
identity_base_url = "https://eu1.cloud.thethings.network"
radio_plane_base_url = "https://au1.cloud.thethings.network"
radio_plane_host = "au1.cloud.thethings.network"

[http]
request_timeout_secs = 12

[provision]
default_frequency_plan = "AU_915_928_FSB_2"
key_label_prefix = "Cold Chain"
output_dir = "keys"
run_deadline_secs = 90

[audit]
url = "https://audit.example.net/rest/v1"
"#;

#[test]
fn test_partial_file_keeps_defaults_for_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, DEPLOYMENT).unwrap();

    let config = TetherConfig::load_from_file(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.topology.radio_plane_host, "au1.cloud.thethings.network");
    assert_eq!(config.http.request_timeout_secs, 12);
    assert_eq!(config.http.connect_timeout_secs, 10);
    assert_eq!(config.provision.key_label_prefix, "Cold Chain");
    assert_eq!(config.provision.device_id_prefix, "gw");
    assert_eq!(config.provision.output_dir, PathBuf::from("keys"));
    assert_eq!(config.provision.run_deadline().unwrap().as_secs(), 90);
    assert_eq!(config.audit.unwrap().table, "gateways");
}

#[test]
fn test_invalid_topology_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[topology]\nradio_plane_base_url = \"nam1.example\"\n").unwrap();

    let config = TetherConfig::load_from_file(&path).unwrap();
    assert_matches!(config.validate(), Err(TetherError::Config { .. }));
}

#[test]
fn test_unreadable_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = TetherConfig::load_from_file(&dir.path().join("absent.toml"));
    assert_matches!(result, Err(TetherError::Config { .. }));
}

#[test]
fn test_malformed_toml_is_rejected() {
    assert!(TetherConfig::from_toml("[provision\nbatch_concurrency = 2").is_err());
}
