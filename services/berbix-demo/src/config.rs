//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The API secret is loaded from the BERBIX_API_SECRET env var or
//! api_secret_file, never stored in the TOML directly to avoid leaking it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use berbix_auth::Environment;
use common::Secret;
use serde::Deserialize;
use transport::TransportConfig;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub berbix: BerbixConfig,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Service account settings
#[derive(Debug, Default, Deserialize)]
pub struct BerbixConfig {
    #[serde(default)]
    pub environment: Environment,
    /// Overrides the environment's host when set
    #[serde(default)]
    pub api_host: Option<String>,
    #[serde(default)]
    pub api_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub api_secret: Option<Secret<String>>,
}

/// HTTP timeouts
#[derive(Debug, Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub read_timeout_secs: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_timeout(),
            read_timeout_secs: default_timeout(),
        }
    }
}

impl TransportSettings {
    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

/// Inputs for the walk-through
#[derive(Debug, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_customer_uid")]
    pub customer_uid: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            customer_uid: default_customer_uid(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_customer_uid() -> String {
    "customer uid".to_string()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// API secret resolution order:
    /// 1. BERBIX_API_SECRET env var
    /// 2. api_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Some(host) = &config.berbix.api_host {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "api_host must start with http:// or https://, got: {host}"
                )));
            }
        }

        if config.transport.connect_timeout_secs == 0 {
            return Err(common::Error::Config(
                "connect_timeout_secs must be greater than 0".into(),
            ));
        }

        if config.transport.read_timeout_secs == 0 {
            return Err(common::Error::Config(
                "read_timeout_secs must be greater than 0".into(),
            ));
        }

        if let Ok(secret) = std::env::var("BERBIX_API_SECRET") {
            config.berbix.api_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.berbix.api_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read api_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.berbix.api_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("berbix-demo.toml")
    }
}
