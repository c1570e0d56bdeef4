use std::collections::HashMap;

use tempfile::TempDir;

use webpac_scraper::config::EnvProvider;
use webpac_scraper::{
    Config, ConfigError, ConfigManager, PaymentProtocol, Release, SuppressionMode,
};

struct MapEnv(HashMap<&'static str, &'static str>);

impl EnvProvider for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|value| value.to_string())
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.network.timeout_seconds, 6);
    assert_eq!(config.network.retry_attempts, 10);
    assert_eq!(config.catalog.release, Release::Millennium2007);
    assert_eq!(config.catalog.suppress_codes, vec!["n", "d", "p"]);
    assert_eq!(config.catalog.suppression_mode, SuppressionMode::Hide);
    assert_eq!(config.payment_protocol(), PaymentProtocol::SessionKey);
}

#[test]
fn test_payment_protocol_follows_release() {
    let mut config = Config::default();
    config.catalog.release = Release::Millennium2006;
    assert_eq!(config.payment_protocol(), PaymentProtocol::Checksum);

    config.workflow.payment_protocol = Some(PaymentProtocol::SessionKey);
    assert_eq!(config.payment_protocol(), PaymentProtocol::SessionKey);
}

#[tokio::test]
async fn test_load_toml_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("webpac-scraper.toml");
    tokio::fs::write(
        &path,
        r#"
[server]
host = "catalog.example.org"
port = 8080

[catalog]
release = "2009"
available_tokens = ["AVAILABLE", "CHECK SHELF"]
suppression_mode = "flag"

[[catalog.branch_rules]]
category = "main"
matcher = "mn,mr"

[[catalog.age_rules]]
category = "juvenile"
matcher = "/^j/i"

[workflow]
payment_protocol = "checksum"
race_delay_ms = 0
"#,
    )
    .await
    .unwrap();

    let config = ConfigManager::load_from_file(&path).await.unwrap();
    assert_eq!(config.server.host, "catalog.example.org");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.catalog.release, Release::Millennium2009);
    assert_eq!(config.catalog.available_tokens.len(), 2);
    assert_eq!(config.catalog.suppression_mode, SuppressionMode::Flag);
    assert_eq!(config.catalog.branch_rules[0].matcher, "mn,mr");
    assert_eq!(config.payment_protocol(), PaymentProtocol::Checksum);
    assert_eq!(config.workflow.race_delay_ms, 0);
    // Unset sections keep their defaults
    assert_eq!(config.network.retry_attempts, 10);
    assert!(ConfigManager::validate_config(&config).is_ok());
}

#[tokio::test]
async fn test_load_json_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    tokio::fs::write(
        &path,
        r#"{"server": {"host": "json.example.org"}, "network": {"retry_attempts": 4}}"#,
    )
    .await
    .unwrap();

    let config = ConfigManager::load_from_file(&path).await.unwrap();
    assert_eq!(config.server.host, "json.example.org");
    assert_eq!(config.network.retry_attempts, 4);
}

#[tokio::test]
async fn test_unsupported_extension() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    tokio::fs::write(&path, "server: {}").await.unwrap();

    let error = ConfigManager::load_from_file(&path).await.unwrap_err();
    assert!(matches!(error, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
}

#[test]
fn test_environment_overrides() {
    let env = MapEnv(HashMap::from([
        ("WEBPAC_HOST", " env.example.org "),
        ("WEBPAC_RELEASE", "2006"),
        ("WEBPAC_SUPPRESS_CODES", "n, x"),
        ("WEBPAC_PAYMENT_PROTOCOL", "session-key"),
    ]));

    let config = ConfigManager::apply_environment_overrides_with(&env, Config::default()).unwrap();
    assert_eq!(config.server.host, "env.example.org");
    assert_eq!(config.catalog.release, Release::Millennium2006);
    assert_eq!(config.catalog.suppress_codes, vec!["n", "x"]);
    assert_eq!(config.payment_protocol(), PaymentProtocol::SessionKey);
}
