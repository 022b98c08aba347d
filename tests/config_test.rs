//! Config loading and defaults integration tests

use std::path::PathBuf;

use tempfile::TempDir;

use gateway_cache_core::Config;

#[test]
fn test_config_with_all_fields() {
    let toml_str = r#"
[cache]
ttl_secs = 3600
refresh_disabled = true

[cache.ttl_overrides]
wcpay_business_types_data = 604800

[rate_limiter]
declined_card_threshold = 3
declined_card_window_secs = 300
declined_card_cooldown_secs = 900

[storage]
database_path = "/var/lib/gateway/cache.db"
"#;

    let config = Config::from_toml_str(toml_str).expect("valid TOML");

    assert_eq!(config.cache.ttl_secs, 3600);
    assert!(config.cache.refresh_disabled);
    assert_eq!(config.cache.ttl_for("wcpay_business_types_data"), 604_800);
    assert_eq!(config.cache.ttl_for("wcpay_account_data"), 3600);

    let policy = config.rate_limiter.declined_card_policy();
    assert_eq!(policy.threshold, 3);
    assert_eq!(policy.window.as_secs(), 300);
    assert_eq!(policy.cooldown.as_secs(), 900);

    assert_eq!(
        config.storage.database_path,
        PathBuf::from("/var/lib/gateway/cache.db")
    );
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = Config::from_toml_str("[rate_limiter]\ndeclined_card_threshold = 10\n").unwrap();

    assert_eq!(config.rate_limiter.declined_card_threshold, 10);
    assert_eq!(config.rate_limiter.declined_card_window_secs, 600);
    assert_eq!(config.cache.ttl_secs, 86_400);
}

#[test]
fn test_invalid_toml_is_rejected() {
    assert!(Config::from_toml_str("[cache]\nttl_secs = \"soon\"\n").is_err());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.cache.ttl_secs, 86_400);
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gateway-cache.toml");
    std::fs::write(&path, "[cache]\nttl_secs = 120\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.cache.ttl_secs, 120);
}
