//! Configuration loading tests

use tempfile::TempDir;

use ipinfo::config::{StaticConfig, validate_static_config};

#[test]
fn test_load_from_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ipinfo.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 9090
trusted_proxies = ["10.0.0.0/8"]

[geoip]
data_dir = "/var/lib/ipinfo"

[refresh]
interval_secs = 43200

[logging]
format = "json"
"#,
    )
    .unwrap();

    let config = StaticConfig::load(Some(path.to_str().unwrap()));

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.trusted_proxies, vec!["10.0.0.0/8"]);
    assert_eq!(config.geoip.data_dir, "/var/lib/ipinfo");
    assert_eq!(config.geoip.city_file, "GeoLite2-City.mmdb");
    assert_eq!(config.refresh.interval_secs, 43200);
    assert_eq!(config.refresh.retry_interval_secs, 3600);
    assert_eq!(config.logging.format, "json");
    assert!(validate_static_config(&config).is_ok());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config = StaticConfig::load(Some(path.to_str().unwrap()));

    assert_eq!(config.geoip.scratch_dir_name, "temp");
    assert_eq!(config.refresh.member_suffix, ".mmdb");
    assert!(config.cors.enabled);
}

#[test]
fn test_legacy_env_names_override_file_values() {
    let mut config = StaticConfig::default();
    config.server.port = 9090;

    let warnings = config.apply_env_overrides(|key| match key {
        "SERVER_PORT" => Some("7000".to_string()),
        "GEOIP_DATA_DIR" => Some("/data".to_string()),
        "MAXMIND_LICENSE_KEY" => Some("secret".to_string()),
        _ => None,
    });

    assert!(warnings.is_empty());
    assert_eq!(config.server.port, 7000);
    assert_eq!(config.geoip.data_dir, "/data");
    assert_eq!(config.refresh.license_key(), Some("secret"));
}

#[test]
fn test_invalid_file_values_are_reported() {
    let mut config = StaticConfig::default();
    config.refresh.download_url = "https://example.invalid/db.tar.gz".to_string();
    config.logging.format = "xml".to_string();

    let problems = validate_static_config(&config).unwrap_err();
    assert_eq!(problems.len(), 2);
}
