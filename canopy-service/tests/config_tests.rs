use canopy_service::{DEFAULT_POOL_SIZE, ServiceConfig, ServiceError};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

#[test]
fn defaults() {
    let config = ServiceConfig::default();
    assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
    assert_eq!(config.call_timeout(), None);
    assert!(config.sites.is_empty());
    config.validate().unwrap();
}

#[test]
fn parses_full_document() {
    let config = ServiceConfig::from_toml_str(
        r#"
        info_path = "/tmp/canopy/info.sock"
        pool_size = 4
        call_timeout_ms = 2500

        [sites.example]
        templates_path = "/srv/example/templates"

        [sites.other]
        templates_path = "/srv/other/templates"
        "#,
    )
    .unwrap();

    assert_eq!(config.info_path, "/tmp/canopy/info.sock");
    assert_eq!(config.pool_size, 4);
    assert_eq!(config.call_timeout(), Some(Duration::from_millis(2500)));
    assert_eq!(
        config.site_templates_path("example"),
        Some(Path::new("/srv/example/templates"))
    );
    assert_eq!(config.site_templates_path("missing"), None);
}

#[test]
fn omitted_keys_take_defaults() {
    let config = ServiceConfig::from_toml_str(r#"info_path = "/run/info.sock""#).unwrap();
    assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
    assert_eq!(config.call_timeout_ms, None);
}

#[test]
fn zero_pool_size_is_rejected() {
    let err = ServiceConfig::from_toml_str("pool_size = 0").unwrap_err();
    assert!(matches!(err, ServiceError::Config(ref m) if m.contains("pool_size")));
}

#[test]
fn empty_info_path_is_rejected() {
    let err = ServiceConfig::from_toml_str(r#"info_path = """#).unwrap_err();
    assert!(matches!(err, ServiceError::Config(_)));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = ServiceConfig::from_toml_str("pool_size = [").unwrap_err();
    assert!(matches!(err, ServiceError::Config(_)));
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "info_path = \"/run/canopy/info.sock\"").unwrap();
    writeln!(file, "pool_size = 2").unwrap();

    let config = ServiceConfig::from_file(file.path()).unwrap();
    assert_eq!(config.pool_size, 2);
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ServiceConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ServiceError::Config(_)));
}
