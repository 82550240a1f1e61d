//! Berbix API hosts, paths, and client identity

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::Error;

pub const PRODUCTION_HOST: &str = "https://api.berbix.com";
pub const STAGING_HOST: &str = "https://api.staging.berbix.com";
pub const SANDBOX_HOST: &str = "https://api.sandbox.berbix.com";

/// Transaction creation (returns a full token set)
pub const TRANSACTIONS_PATH: &str = "/v0/transactions";
/// Refresh and authorization-code exchange
pub const TOKENS_PATH: &str = "/v0/tokens";
pub const OVERRIDE_PATH: &str = "/v0/transactions/override";
pub const CONTINUATIONS_PATH: &str = "/v0/continuations";

/// Sent as `User-Agent` on every request.
pub const USER_AGENT: &str = concat!("BerbixRust/", env!("CARGO_PKG_VERSION"));

/// Berbix deployment the client talks to when no host override is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    Staging,
    Sandbox,
}

impl Environment {
    pub fn host(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_HOST,
            Environment::Staging => STAGING_HOST,
            Environment::Sandbox => SANDBOX_HOST,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Sandbox => "sandbox",
        };
        f.write_str(name)
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "sandbox" => Ok(Environment::Sandbox),
            other => Err(Error::Config(format!(
                "invalid environment value specified: {other}"
            ))),
        }
    }
}

/// Goes through `FromStr`, so config files accept the same spellings.
impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
