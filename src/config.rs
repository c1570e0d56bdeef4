use crate::availability::CategoryMatcher;
use crate::cli::Cli;
use crate::rules::Release;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub catalog: CatalogConfig,
    pub workflow: WorkflowConfig,
}

/// Where the catalog lives and how to reach it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Catalog host name, without scheme
    pub host: String,
    /// Port for plain HTTP requests
    pub port: u16,
    /// Port for TLS requests
    pub ssl_port: u16,
    /// Run patron sessions over TLS
    pub secure_sessions: bool,
    /// Accept self-signed catalog certificates
    pub accept_invalid_certs: bool,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Total attempts before the catalog is reported unreachable
    pub retry_attempts: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Upper bound on the delay when backing off exponentially
    pub max_retry_delay_ms: u64,
    /// Double the delay after every failed attempt
    pub exponential_backoff: bool,
}

/// One age or branch classification rule.
///
/// `matcher` is either a comma-separated list of location codes or a
/// `/regex/` applied to the location code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: String,
    pub matcher: String,
}

/// How suppressed bib records are reported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionMode {
    /// Report the record as not found
    #[default]
    Hide,
    /// Return the record with `suppressed` set
    Flag,
}

/// Two-phase commit flavour used by the fine payment pages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentProtocol {
    /// Confirmation page hands back a `cksum` token
    Checksum,
    /// Fines page carries a session `key` reused by both phases
    SessionKey,
}

/// Catalog-specific extraction settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub release: Release,
    /// Search scope inserted into holdings paths, e.g. `~S24`
    pub search_scope: Option<u32>,
    /// Status strings that mean a copy is on the shelf
    pub available_tokens: Vec<String>,
    /// Location code to display name
    pub location_names: BTreeMap<String, String>,
    pub age_rules: Vec<CategoryRule>,
    pub branch_rules: Vec<CategoryRule>,
    pub default_age: String,
    pub default_branch: String,
    /// BCODE3 values that suppress a record
    pub suppress_codes: Vec<String>,
    pub suppression_mode: SuppressionMode,
    /// Material codes whose call number gets the 130 $a shelving word
    pub shelving_material_codes: Vec<String>,
    /// Cover image URL with a `{stdnum}` placeholder
    pub cover_url_template: Option<String>,
}

/// Timing and behaviour of the patron workflows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Defaults from the catalog release when unset
    pub payment_protocol: Option<PaymentProtocol>,
    /// Pause before hold and renewal requests
    pub race_delay_ms: u64,
    /// Pause after submitting a payment
    pub payment_settle_ms: u64,
    /// Look up the bib number of every loaned item
    pub resolve_bib_numbers: bool,
    /// Request the due-date sorted loan listing
    pub sort_loans_by_due: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 80,
            ssl_port: 443,
            secure_sessions: true,
            accept_invalid_certs: false,
        }
    }
}

impl ServerConfig {
    /// Base URL for patron sessions, honouring the TLS choice
    pub fn secure_base_url(&self) -> String {
        if self.secure_sessions {
            format!("https://{}:{}/", self.host, self.ssl_port)
        } else {
            self.insecure_base_url()
        }
    }

    /// Base URL for public catalog pages and record exports
    pub fn insecure_base_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 6,
            retry_attempts: 10,
            retry_delay_ms: 250,
            max_retry_delay_ms: 4000,
            exponential_backoff: false,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            release: Release::default(),
            search_scope: None,
            available_tokens: vec!["AVAILABLE".to_string()],
            location_names: BTreeMap::new(),
            age_rules: Vec::new(),
            branch_rules: Vec::new(),
            default_age: "adult".to_string(),
            default_branch: "unknown".to_string(),
            suppress_codes: vec!["n".to_string(), "d".to_string(), "p".to_string()],
            suppression_mode: SuppressionMode::Hide,
            shelving_material_codes: ["a", "b", "i", "l", "x"]
                .iter()
                .map(|code| code.to_string())
                .collect(),
            cover_url_template: None,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            payment_protocol: None,
            race_delay_ms: 300,
            payment_settle_ms: 500,
            resolve_bib_numbers: true,
            sort_loans_by_due: true,
        }
    }
}

impl Config {
    /// Payment protocol in effect for this deployment
    pub fn payment_protocol(&self) -> PaymentProtocol {
        self.workflow
            .payment_protocol
            .unwrap_or_else(|| self.catalog.release.payment_protocol())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;

        // CLI has the final say
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "webpac-scraper.toml",
            "webpac-scraper.json",
            ".webpac-scraper.toml",
            ".webpac-scraper.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("webpac-scraper");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Server settings
        if let Some(host) = env.get("WEBPAC_HOST") {
            config.server.host = host.trim().to_string();
        }
        if let Some(port) = env.get("WEBPAC_PORT") {
            config.server.port = parse_env("WEBPAC_PORT", &port)?;
        }
        if let Some(ssl_port) = env.get("WEBPAC_SSL_PORT") {
            config.server.ssl_port = parse_env("WEBPAC_SSL_PORT", &ssl_port)?;
        }
        if let Some(secure) = env.get("WEBPAC_SECURE_SESSIONS") {
            config.server.secure_sessions = parse_env("WEBPAC_SECURE_SESSIONS", &secure)?;
        }

        // Network settings
        if let Some(timeout) = env.get("WEBPAC_TIMEOUT") {
            config.network.timeout_seconds = parse_env("WEBPAC_TIMEOUT", &timeout)?;
        }
        if let Some(retry_attempts) = env.get("WEBPAC_RETRY_ATTEMPTS") {
            config.network.retry_attempts = parse_env("WEBPAC_RETRY_ATTEMPTS", &retry_attempts)?;
        }

        // Catalog settings
        if let Some(release) = env.get("WEBPAC_RELEASE") {
            config.catalog.release = release
                .parse()
                .map_err(|_| ConfigError::Environment(format!("Invalid WEBPAC_RELEASE value: {}", release)))?;
        }
        if let Some(tokens) = env.get("WEBPAC_AVAILABLE_TOKENS") {
            config.catalog.available_tokens = split_list(&tokens);
        }
        if let Some(codes) = env.get("WEBPAC_SUPPRESS_CODES") {
            config.catalog.suppress_codes = split_list(&codes);
        }
        if let Some(mode) = env.get("WEBPAC_SUPPRESSION_MODE") {
            config.catalog.suppression_mode = match mode.to_lowercase().as_str() {
                "hide" => SuppressionMode::Hide,
                "flag" => SuppressionMode::Flag,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid WEBPAC_SUPPRESSION_MODE value: {}",
                        mode
                    )));
                }
            };
        }

        // Workflow settings
        if let Some(protocol) = env.get("WEBPAC_PAYMENT_PROTOCOL") {
            config.workflow.payment_protocol = Some(match protocol.to_lowercase().as_str() {
                "checksum" => PaymentProtocol::Checksum,
                "session-key" | "sessionkey" => PaymentProtocol::SessionKey,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid WEBPAC_PAYMENT_PROTOCOL value: {}",
                        protocol
                    )));
                }
            });
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(host) = &cli.host {
            config.server.host = host.clone();
        }
        if cli.insecure {
            config.server.secure_sessions = false;
        }
        if let Some(release) = cli.release {
            config.catalog.release = release;
        }
        if let Some(timeout) = cli.timeout {
            config.network.timeout_seconds = timeout;
        }
        if let Some(retry_attempts) = cli.retry_attempts {
            config.network.retry_attempts = retry_attempts;
        }

        config
    }

    /// Merge two configurations (second takes precedence)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        if !override_config.server.host.is_empty() {
            base.server.host = override_config.server.host;
        }
        base.server.port = override_config.server.port;
        base.server.ssl_port = override_config.server.ssl_port;
        base.server.secure_sessions = override_config.server.secure_sessions;
        base.server.accept_invalid_certs = override_config.server.accept_invalid_certs;

        base.network = override_config.network;

        let catalog = override_config.catalog;
        base.catalog.release = catalog.release;
        if catalog.search_scope.is_some() {
            base.catalog.search_scope = catalog.search_scope;
        }
        if !catalog.available_tokens.is_empty() {
            base.catalog.available_tokens = catalog.available_tokens;
        }
        if !catalog.location_names.is_empty() {
            base.catalog.location_names = catalog.location_names;
        }
        if !catalog.age_rules.is_empty() {
            base.catalog.age_rules = catalog.age_rules;
        }
        if !catalog.branch_rules.is_empty() {
            base.catalog.branch_rules = catalog.branch_rules;
        }
        base.catalog.default_age = catalog.default_age;
        base.catalog.default_branch = catalog.default_branch;
        base.catalog.suppress_codes = catalog.suppress_codes;
        base.catalog.suppression_mode = catalog.suppression_mode;
        base.catalog.shelving_material_codes = catalog.shelving_material_codes;
        if catalog.cover_url_template.is_some() {
            base.catalog.cover_url_template = catalog.cover_url_template;
        }

        base.workflow = override_config.workflow;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.server.port == 0 || config.server.ssl_port == 0 {
            return Err(ConfigError::Validation(
                "Ports must be greater than 0".to_string(),
            ));
        }

        if config.server.host.contains("://") || config.server.host.contains('/') {
            return Err(ConfigError::Validation(format!(
                "Host must be a bare host name: {}",
                config.server.host
            )));
        }

        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.retry_attempts == 0 {
            return Err(ConfigError::Validation(
                "At least one attempt must be allowed".to_string(),
            ));
        }

        if config.network.retry_attempts > 50 {
            return Err(ConfigError::Validation(
                "Retry attempts cannot exceed 50".to_string(),
            ));
        }

        if config.catalog.available_tokens.is_empty() {
            return Err(ConfigError::Validation(
                "At least one available token must be specified".to_string(),
            ));
        }

        for rule in config
            .catalog
            .age_rules
            .iter()
            .chain(config.catalog.branch_rules.iter())
        {
            CategoryMatcher::compile(rule).map_err(|e| {
                ConfigError::Validation(format!("Invalid rule for '{}': {}", rule.category, e))
            })?;
        }

        if let Some(template) = &config.catalog.cover_url_template
            && !template.contains("{stdnum}")
        {
            return Err(ConfigError::Validation(
                "Cover URL template must contain {stdnum}".to_string(),
            ));
        }

        Ok(())
    }

    /// Convert configuration to Duration for network timeout
    pub fn get_timeout_duration(config: &Config) -> Duration {
        Duration::from_secs(config.network.timeout_seconds)
    }

    pub fn get_race_delay_duration(config: &Config) -> Duration {
        Duration::from_millis(config.workflow.race_delay_ms)
    }

    pub fn get_payment_settle_duration(config: &Config) -> Duration {
        Duration::from_millis(config.workflow.payment_settle_ms)
    }
}
