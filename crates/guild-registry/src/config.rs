use std::path::Path;

use guild_types::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Setup parameters for a registry, usually read from a TOML file:
///
/// ```toml
/// name = "Guild"
/// symbol = "GLD"
/// base_uri = "https://guild.example/credentials/"
/// admin = "<64 hex chars>"
/// timelock = "<64 hex chars>"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub name: String,
    pub symbol: String,
    /// Prefix for credential URIs; none means URIs are empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    /// Receives role-admin, issue, upgrade-admin, and revoke.
    pub admin: AccountId,
    /// Receives revoke.
    pub timelock: AccountId,
}

impl RegistryConfig {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        admin: AccountId,
        timelock: AccountId,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            base_uri: None,
            admin,
            timelock,
        }
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn from_toml_str(s: &str) -> RegistryResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| RegistryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> RegistryResult<String> {
        toml::to_string(self).map_err(|e| RegistryError::Config(e.to_string()))
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::Config("name must not be empty".into()));
        }
        if self.symbol.trim().is_empty() {
            return Err(RegistryError::Config("symbol must not be empty".into()));
        }
        if self.admin.is_null() {
            return Err(RegistryError::Config("admin must not be the null account".into()));
        }
        if self.timelock.is_null() {
            return Err(RegistryError::Config(
                "timelock must not be the null account".into(),
            ));
        }
        Ok(())
    }
}
