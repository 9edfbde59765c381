use shop_countdown::config::{Config, load_from_path, load_or_default, save_to_path};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_valid() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let config_content = r#"
        [api]
        base_url = "https://countdown.example.com/api"
        retries = 5

        [engine]
        utc_offset = "+05:30"

        [cadence]
        active_ms = 500
        inactive_ms = 60000

        [log]
        filter = "shop_countdown=debug"
    "#;
    temp_file.write_all(config_content.as_bytes()).unwrap();

    let config = load_from_path(temp_file.path()).expect("Failed to load valid config");

    assert_eq!(config.api.base_url, "https://countdown.example.com/api");
    assert_eq!(config.api.retries, 5);
    assert_eq!(
        config.engine.offset().unwrap().map(|o| o.local_minus_utc()),
        Some(5 * 3600 + 1800)
    );

    let cadence = config.cadence.to_cadence();
    assert_eq!(cadence.active, Duration::from_millis(500));
    assert_eq!(cadence.pending, Duration::from_secs(10));
    assert_eq!(cadence.inactive, Duration::from_secs(60));
    assert_eq!(config.log.filter, "shop_countdown=debug");
}

#[test]
fn test_load_config_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"").unwrap();

    let config = load_from_path(temp_file.path()).expect("Empty config should use defaults");
    assert_eq!(config.api.base_url, "http://localhost:8000/api");
    assert_eq!(config.api.retries, 3);
    assert!(config.engine.utc_offset.is_none());
    assert!(config.state.state_dir_override.is_none());
    assert_eq!(config.log.filter, "info");
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_or_default(dir.path().join("config.toml")).unwrap();
    assert_eq!(config.cadence.active_ms, 1000);
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[cadence]\nactive_ms = 0\n")
        .unwrap();

    // Parses, but validation refuses it
    assert!(load_from_path(temp_file.path()).is_ok());
    assert!(load_or_default(temp_file.path()).is_err());
}

#[test]
fn test_save_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.api.base_url = "https://shop.example/api".to_string();
    config.engine.utc_offset = Some("-04:00".to_string());
    config.state.state_dir_override = Some(dir.path().join("state"));
    save_to_path(&config, &path).unwrap();

    let loaded = load_from_path(&path).unwrap();
    assert_eq!(loaded.api.base_url, "https://shop.example/api");
    assert_eq!(loaded.engine.utc_offset.as_deref(), Some("-04:00"));
    assert_eq!(loaded.state.state_dir_override, Some(dir.path().join("state")));
}
