//! Warden Core Library
//!
//! Shared configuration and error types for the Warden directory
//! authentication service.

pub mod config;
pub mod error;

pub use config::{DirectoryConfig, WardenConfig};
pub use error::{Error, Result};

/// Warden version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default LDAP global catalog port used for directory queries
pub const DEFAULT_CATALOG_PORT: u16 = 3268;

/// Default port used by the controller liveness probe
pub const DEFAULT_PROBE_PORT: u16 = 389;

/// Default liveness probe timeout in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 1;

/// Role identifier assigned when no configured group matches
pub const UNPRIVILEGED_ROLE: u32 = 0;
