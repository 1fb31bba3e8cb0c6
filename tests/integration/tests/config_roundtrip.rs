//! Config save/load roundtrip integration tests.
//!
//! These tests verify that configuration can be serialized, written to disk,
//! and loaded back with identical field values.

use fleetgate_core::config::{BindMode, Config};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    // Default port should survive the roundtrip
    assert_eq!(loaded.gateway.port, config.gateway.port);
    // Default bind mode should survive the roundtrip
    assert_eq!(loaded.gateway.bind, config.gateway.bind);
    // Session policy knobs should survive the roundtrip
    assert_eq!(loaded.gateway.max_sessions, config.gateway.max_sessions);
    assert_eq!(loaded.gateway.idle_timeout_secs, config.gateway.idle_timeout_secs);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.gateway.port = 9090;
    config.gateway.bind = BindMode::Lan;
    config.gateway.auth_token = Some("secret".to_string());
    config.remote.base_url = Some("https://fleet.example.com".to_string());
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.port, 9090);
    assert_eq!(loaded.gateway.bind, BindMode::Lan);
    assert_eq!(loaded.gateway.auth_token.as_deref(), Some("secret"));
    assert_eq!(
        loaded.remote.base_url.as_deref(),
        Some("https://fleet.example.com")
    );
    loaded.validate().unwrap();
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/config.json"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
