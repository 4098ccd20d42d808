//! Directory protocol capability interface
//!
//! Abstracts the LDAP primitives the pipeline needs (connect, bind,
//! search, sort, fetch-entries, unbind) behind traits, with a
//! production implementation backed by the `ldap3` crate. Read-only:
//! no directory write operations are exposed.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Protocol-level failure from a directory primitive.
///
/// Carried in logs only; the pipeline maps these to the generic stage
/// errors shown to callers.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("ldap protocol error: {0}")]
    Protocol(#[from] ldap3::LdapError),

    #[error("directory operation rejected (rc={rc}): {text}")]
    Rejected { rc: u32, text: String },
}

/// LDAP result code for invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

impl DirectoryError {
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(
            self,
            DirectoryError::Rejected {
                rc: RC_INVALID_CREDENTIALS,
                ..
            }
        )
    }
}

/// A parsed directory entry: DN plus attribute values.
///
/// Attribute names are lowercased by the implementation so lookups are
/// insensitive to server-side casing (`memberOf` vs `memberof`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// First value of a single-valued attribute.
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.attrs
            .get(attr)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of an attribute; empty when absent.
    pub fn values(&self, attr: &str) -> &[String] {
        self.attrs.get(attr).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Opaque handle for an executed search, held between the search and
/// fetch-entries stages.
#[derive(Debug)]
pub struct SearchResult {
    entries: Vec<DirectoryEntry>,
}

impl SearchResult {
    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stable sort by the first value of the named attribute; entries
    /// missing the attribute sort first.
    pub fn sort_by_attribute(&mut self, key: &str) {
        let key = key.to_ascii_lowercase();
        self.entries
            .sort_by(|a, b| a.first(&key).unwrap_or("").cmp(b.first(&key).unwrap_or("")));
    }

    pub fn into_entries(self) -> Vec<DirectoryEntry> {
        self.entries
    }
}

/// Opens connections to a directory endpoint.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    type Conn: DirectoryConnection;

    /// Connect to `host`, falling back to the protocol default port
    /// when `port` is `None`.
    async fn connect(&self, host: &str, port: Option<u16>) -> Result<Self::Conn, DirectoryError>;
}

/// One open directory connection, consumed by a single pipeline call.
#[async_trait]
pub trait DirectoryConnection: Send {
    async fn bind(&mut self, principal: &str, password: &str) -> Result<(), DirectoryError>;

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[String],
    ) -> Result<SearchResult, DirectoryError>;

    fn sort(&mut self, result: &mut SearchResult, key: &str) -> Result<(), DirectoryError>;

    fn entries(&mut self, result: SearchResult) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    async fn unbind(&mut self) -> Result<(), DirectoryError>;
}

/// `ldap3`-backed connector.
#[derive(Debug, Clone)]
pub struct LdapConnector {
    connect_timeout: Duration,
}

impl LdapConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

/// `ldap3`-backed connection.
pub struct LdapConnection {
    ldap: Ldap,
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    type Conn = LdapConnection;

    async fn connect(&self, host: &str, port: Option<u16>) -> Result<LdapConnection, DirectoryError> {
        let url = match port {
            Some(port) => format!("ldap://{}:{}", host, port),
            None => format!("ldap://{}", host),
        };

        debug!(%url, "connecting to directory server");

        let settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url).await?;
        ldap3::drive!(conn);

        Ok(LdapConnection { ldap })
    }
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn bind(&mut self, principal: &str, password: &str) -> Result<(), DirectoryError> {
        let result = self.ldap.simple_bind(principal, password).await?;
        if result.rc != 0 {
            return Err(DirectoryError::Rejected {
                rc: result.rc,
                text: result.text,
            });
        }
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[String],
    ) -> Result<SearchResult, DirectoryError> {
        let (rs, _res) = self
            .ldap
            .search(base_dn, Scope::Subtree, filter, attrs.to_vec())
            .await?
            .success()?;

        let entries = rs
            .into_iter()
            .map(|raw| {
                let entry = SearchEntry::construct(raw);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: lowercase_attribute_names(entry.attrs),
                }
            })
            .collect();

        Ok(SearchResult::from_entries(entries))
    }

    fn sort(&mut self, result: &mut SearchResult, key: &str) -> Result<(), DirectoryError> {
        result.sort_by_attribute(key);
        Ok(())
    }

    fn entries(&mut self, result: SearchResult) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        Ok(result.into_entries())
    }

    async fn unbind(&mut self) -> Result<(), DirectoryError> {
        self.ldap.unbind().await?;
        Ok(())
    }
}

/// Normalize attribute names to lowercase, the casing the rest of the
/// pipeline and the identity mapper match against.
fn lowercase_attribute_names(
    attrs: HashMap<String, Vec<String>>,
) -> HashMap<String, Vec<String>> {
    attrs
        .into_iter()
        .map(|(name, values)| (name.to_ascii_lowercase(), values))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dn: &str, attrs: &[(&str, &[&str])]) -> DirectoryEntry {
        DirectoryEntry {
            dn: dn.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
                .collect(),
        }
    }

    #[test]
    fn test_entry_accessors() {
        let e = entry(
            "CN=Jane,DC=corp",
            &[("mail", &["jane@corp.example.com"]), ("cn", &["Jane"])],
        );
        assert_eq!(e.first("mail"), Some("jane@corp.example.com"));
        assert_eq!(e.first("missing"), None);
        assert!(e.values("missing").is_empty());
    }

    #[test]
    fn test_attribute_name_normalization() {
        let attrs = HashMap::from([
            ("memberOf".to_string(), vec!["CN=Admins".to_string()]),
            ("displayName".to_string(), vec!["Jane Doe".to_string()]),
        ]);
        let normalized = lowercase_attribute_names(attrs);
        assert!(normalized.contains_key("memberof"));
        assert!(normalized.contains_key("displayname"));
    }

    #[test]
    fn test_sort_by_attribute() {
        let mut result = SearchResult::from_entries(vec![
            entry("CN=b", &[("sn", &["Santos"])]),
            entry("CN=c", &[]),
            entry("CN=a", &[("sn", &["Alvarez"])]),
        ]);
        result.sort_by_attribute("sn");

        let dns: Vec<_> = result.into_entries().into_iter().map(|e| e.dn).collect();
        // Missing attribute sorts first.
        assert_eq!(dns, vec!["CN=c", "CN=a", "CN=b"]);
    }

    #[test]
    fn test_invalid_credentials_detection() {
        let rejected = DirectoryError::Rejected {
            rc: 49,
            text: "80090308: LdapErr: invalid credentials".to_string(),
        };
        assert!(rejected.is_invalid_credentials());

        let busy = DirectoryError::Rejected {
            rc: 51,
            text: "busy".to_string(),
        };
        assert!(!busy.is_invalid_credentials());
    }
}
