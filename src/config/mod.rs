use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Front-end origins allowed to call the API from a browser
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// User id assumed when a request has no X-User-Id header
    #[serde(default = "default_caller_id")]
    pub default_caller_id: i64,
    /// Reject requests without an X-User-Id header instead of using the default caller
    #[serde(default)]
    pub require_caller_header: bool,
    /// Name of the admin user created when the user table is empty
    #[serde(default = "default_bootstrap_admin_name")]
    pub bootstrap_admin_name: String,
}

impl AuthConfig {
    /// Caller used for requests that do not name one, if any
    pub fn fallback_caller_id(&self) -> Option<i64> {
        if self.require_caller_header {
            None
        } else {
            Some(self.default_caller_id)
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            default_caller_id: default_caller_id(),
            require_caller_header: false,
            bootstrap_admin_name: default_bootstrap_admin_name(),
        }
    }
}

fn default_caller_id() -> i64 {
    1
}

fn default_bootstrap_admin_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    /// Parse and validate a TOML configuration document
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be between 1 and 65535");
        }
        if self.auth.bootstrap_admin_name.trim().is_empty() {
            bail!("auth.bootstrap_admin_name must not be empty");
        }
        if self.auth.default_caller_id <= 0 {
            bail!("auth.default_caller_id must be a positive user id");
        }
        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
