//! Configuration for Warden

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl WardenConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Configuration(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("WARDEN_DIRECTORY_PORT") {
            if let Ok(p) = port.parse() {
                config.directory.port = Some(p);
            }
        }
        if let Ok(dn) = std::env::var("WARDEN_BASE_DN") {
            config.directory.base_dn = dn;
        }
        if let Ok(pfx) = std::env::var("WARDEN_RDN_PREFIX") {
            config.directory.rdn_prefix = pfx;
        }
        if let Ok(domain) = std::env::var("WARDEN_DOMAIN") {
            config.directory.domain = domain;
        }
        if let Ok(secs) = std::env::var("WARDEN_PROBE_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse() {
                config.directory.probe_timeout_secs = s;
            }
        }
        if let Ok(level) = std::env::var("WARDEN_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }
}

/// Directory service configuration.
///
/// Immutable once handed to the authenticator; required fields are
/// enforced by [`DirectoryConfig::validate`] at service construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory query port. Defaults to the global catalog port (3268)
    /// when absent.
    #[serde(default)]
    pub port: Option<u16>,

    /// Base DN for searches (e.g. "DC=corp,DC=example,DC=com").
    #[serde(default)]
    pub base_dn: String,

    /// RDN prefix combined with the username to form the bind principal.
    /// Must be formatted for Active Directory (e.g. "CORP\\").
    #[serde(default)]
    pub rdn_prefix: String,

    /// Active Directory domain name in dot notation (e.g. "corp.example.com").
    #[serde(default)]
    pub domain: String,

    /// Domain controller pool: network address -> hostname.
    #[serde(default)]
    pub controllers: HashMap<String, String>,

    /// Local role to directory group name mapping.
    #[serde(default)]
    pub group_roles: Vec<GroupRole>,

    /// Port the controller liveness probe connects to.
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    /// Liveness probe timeout per controller, in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Directory connection timeout, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// One local-role-to-directory-group mapping entry.
///
/// The group value is matched as a case-insensitive substring of the
/// group DNs a user is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRole {
    pub role_id: u32,
    pub group: String,
}

fn default_probe_port() -> u16 {
    crate::DEFAULT_PROBE_PORT
}

fn default_probe_timeout() -> u64 {
    crate::DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            port: None,
            base_dn: String::new(),
            rdn_prefix: String::new(),
            domain: String::new(),
            controllers: HashMap::new(),
            group_roles: Vec::new(),
            probe_port: default_probe_port(),
            probe_timeout_secs: default_probe_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl DirectoryConfig {
    /// Validate required fields.
    ///
    /// The authenticator calls this at construction so a partially
    /// configured service can never be built.
    pub fn validate(&self) -> crate::Result<()> {
        if self.base_dn.is_empty() {
            return Err(crate::Error::Configuration("base_dn is required".into()));
        }
        if self.rdn_prefix.is_empty() {
            return Err(crate::Error::Configuration("rdn_prefix is required".into()));
        }
        if self.domain.is_empty() {
            return Err(crate::Error::Configuration("domain is required".into()));
        }
        if self.controllers.is_empty() {
            return Err(crate::Error::Configuration(
                "at least one domain controller is required".into(),
            ));
        }
        Ok(())
    }

    /// Directory query port, falling back to the global catalog port.
    pub fn query_port(&self) -> u16 {
        self.port.unwrap_or(crate::DEFAULT_CATALOG_PORT)
    }

    /// Look up the configured group substring for a role id.
    pub fn group_for_role(&self, role_id: u32) -> Option<&str> {
        self.group_roles
            .iter()
            .find(|gr| gr.role_id == role_id)
            .map(|gr| gr.group.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
