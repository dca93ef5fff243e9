use qbxml_relay::integration::StoreBackend;
use qbxml_relay::{CredentialPolicy, EntityType, RelayConfig, RelaySystem};
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_config_serialization_roundtrip() {
    let original_config = RelayConfig::default();

    let toml_str = original_config
        .to_toml_string()
        .expect("Should be able to serialize config to TOML");

    assert!(!toml_str.is_empty(), "TOML string should not be empty");
    assert!(toml_str.contains("ttl_secs"), "Should contain session ttl");
    assert!(toml_str.contains("[retry]"), "Should contain retry section");

    let deserialized_config =
        RelayConfig::from_toml_str(&toml_str).expect("Should be able to deserialize TOML string");
    assert_eq!(original_config, deserialized_config);
}

#[test]
fn test_config_file_operations() {
    let mut original_config = RelayConfig::default();
    original_config.session.ttl_secs = 3600;
    original_config.credentials = CredentialPolicy::Static {
        username: "qbwc".to_string(),
        password: "hunter2".to_string(),
    };
    original_config.sync.entity_types = vec![EntityType::Customer, EntityType::Invoice];

    let temp_file = NamedTempFile::new().expect("Should be able to create temporary file");
    original_config
        .to_toml_file(temp_file.path())
        .expect("Should be able to save config to file");

    let loaded_config = RelayConfig::from_toml_file(temp_file.path())
        .expect("Should be able to load config from file");
    assert_eq!(original_config, loaded_config);
}

#[test]
fn test_empty_file_yields_defaults() {
    let config = RelayConfig::from_toml_str("").expect("Empty config should parse");
    assert_eq!(config, RelayConfig::default());
    assert_eq!(config.session.backend, StoreBackend::Memory);
    assert_eq!(config.session.ttl_secs, 24 * 60 * 60);
}

#[tokio::test]
async fn test_static_credentials_from_config_gate_authentication() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let path = temp_dir.path().join("qbxml-relay.toml");
    std::fs::write(
        &path,
        r#"
[credentials]
mode = "static"
username = "qbwc"
password = "hunter2"

[retry]
max_retries = 1
initial_delay_ms = 10
"#,
    )
    .expect("Should write config");

    let config = RelayConfig::from_toml_file(&path).expect("Config should load");
    assert_eq!(config.retry.max_retries, 1);
    assert_eq!(config.retry.backoff_multiplier, 2.0);

    let relay = RelaySystem::new(config).expect("Relay should assemble");
    assert_eq!(relay.service().authenticate("qbwc", "wrong").await, "nvu");
    assert_ne!(relay.service().authenticate("qbwc", "hunter2").await, "nvu");
}
