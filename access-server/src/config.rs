//! Configuration for access-server
//!
//! Loaded from an optional TOML file, then overridden by `ACCESS__`-prefixed
//! environment variables (`ACCESS__OTP__MAX_ATTEMPTS=3`,
//! `ACCESS__GATE__JWT_SECRET=...`).

use gate_rs::JwtConfig;
use otp_rs::OtpConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, ServerError};

/// Secret shipped in the development defaults
pub const DEVELOPMENT_JWT_SECRET: &str = "change-me-in-production";

/// Main server configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Allowed CORS origins; empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Session token settings shared with the identity provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
    /// Lifetime of tokens minted by the dev tooling
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite://access.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_jwt_secret() -> String {
    DEVELOPMENT_JWT_SECRET.to_string()
}

fn default_jwt_issuer() -> String {
    "msme-auth".to_string()
}

fn default_token_ttl() -> u64 {
    24 * 3600
}

fn default_log_level() -> String {
    "access_server=info,otp_rs=info,gate_rs=info,tower_http=info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_issuer: default_jwt_issuer(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl GateConfig {
    pub fn jwt(&self) -> JwtConfig {
        JwtConfig::new(
            self.jwt_secret.clone(),
            self.jwt_issuer.clone(),
            self.token_ttl_secs,
        )
    }

    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_JWT_SECRET
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ServerError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from an optional TOML file layered under `ACCESS__` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder
            .add_source(
                config::Environment::with_prefix("ACCESS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<Config>())
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| {
                ServerError::Config(format!(
                    "Invalid listen address '{}': {}",
                    self.server.listen_addr, e
                ))
            })?;

        if self.database.url.is_empty() {
            return Err(ServerError::Config("database.url is empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ServerError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        if self.gate.jwt_secret.is_empty() {
            return Err(ServerError::Config("gate.jwt_secret is empty".to_string()));
        }
        if self.gate.token_ttl_secs == 0 {
            return Err(ServerError::Config(
                "gate.token_ttl_secs must be positive".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ServerError::Config(format!(
                "Unknown log format '{}'",
                self.logging.format
            )));
        }

        self.otp
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.gate.uses_development_secret());
        assert_eq!(config.otp.max_attempts, 5);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
listen_addr = "127.0.0.1:9000"

[otp]
max_attempts = 3
issue_limit = 10

[gate]
jwt_secret = "s3cret"

[logging]
format = "json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.otp.max_attempts, 3);
        assert_eq!(config.otp.issue_limit, 10);
        assert_eq!(config.otp.code_ttl_secs, 300);
        assert!(!config.gate.uses_development_secret());
        assert_eq!(config.database.url, "sqlite://access.db?mode=rwc");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.gate.jwt_secret.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.otp.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.listen_addr = "nowhere".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
        let config = Config::from_file(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_load_without_file() {
        let config = Config::load(None).unwrap();
        assert!(config.validate().is_ok());
    }
}
