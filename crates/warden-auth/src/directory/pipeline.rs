//! Authentication pipeline
//!
//! Orchestrates one directory call as a linear state machine:
//!
//! `Idle -> Connected -> Bound -> Searched -> Sorted -> Fetched -> Closed`
//!
//! Each transition is one directory-protocol primitive and consumes the
//! session by value, so illegal stage ordering does not compile. A
//! failing transition releases the connection before surfacing its
//! stage error; `Closed` is reached on every path.

use crate::directory::client::{
    DirectoryConnection, DirectoryConnector, DirectoryEntry, LdapConnector, SearchResult,
};
use crate::directory::identity::{self, IdentityRecord};
use crate::directory::selector::{ControllerSelector, SelectedController};
use ldap3::ldap_escape;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use warden_core::{DirectoryConfig, Error, Result};

/// Result of a generic directory query: the same logical data either as
/// raw attribute maps (DN under the `dn` key) or as structured entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryOutput {
    Raw(Vec<HashMap<String, Vec<String>>>),
    Structured(Vec<DirectoryEntry>),
}

impl QueryOutput {
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Raw(entries) => entries.len(),
            QueryOutput::Structured(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Directory authentication service.
///
/// Owns the validated configuration, the controller selector, and the
/// connector. Every call runs its own connect/bind/search/unbind
/// sequence on its own connection; nothing is pooled or reused.
pub struct DirectoryAuthenticator<C: DirectoryConnector = LdapConnector> {
    config: DirectoryConfig,
    selector: ControllerSelector,
    connector: C,
}

impl DirectoryAuthenticator<LdapConnector> {
    /// Build the service against a real LDAP backend.
    ///
    /// Fails with a configuration error when a required field is
    /// missing; the service cannot exist partially configured.
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let connector = LdapConnector::new(Duration::from_secs(config.connect_timeout_secs));
        Self::with_connector(config, connector)
    }
}

impl<C: DirectoryConnector> DirectoryAuthenticator<C> {
    /// Build the service with a caller-supplied connector.
    pub fn with_connector(config: DirectoryConfig, connector: C) -> Result<Self> {
        config.validate()?;
        let selector = ControllerSelector::from_config(&config);
        Ok(Self {
            config,
            selector,
            connector,
        })
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Authenticate a username/password pair and map the directory
    /// entry to a local identity.
    ///
    /// Returns `Ok(None)` when the bind succeeded but no directory
    /// entry matched the username: entry presence, not protocol
    /// success, signals whether the user exists.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<IdentityRecord>> {
        let filter = format!("(sAMAccountName={})", ldap_escape(username));
        let attrs: Vec<String> = identity::AUTH_ATTRIBUTES
            .iter()
            .map(|a| a.to_string())
            .collect();

        let entries = self
            .run(username, password, &filter, &attrs, Some(identity::ATTR_SURNAME))
            .await?;

        Ok(entries
            .first()
            .map(|entry| identity::map_entry(entry, &self.config.group_roles)))
    }

    /// Run an arbitrary filtered search through the same pipeline.
    ///
    /// The bind is still performed as the supplied username, so query
    /// execution rights equal that user's directory permissions.
    pub async fn query(
        &self,
        username: &str,
        password: &str,
        filter: &str,
        attributes: &[String],
        sort_key: Option<&str>,
        as_structured: bool,
    ) -> Result<QueryOutput> {
        let entries = self
            .run(username, password, filter, attributes, sort_key)
            .await?;

        Ok(if as_structured {
            QueryOutput::Structured(entries)
        } else {
            QueryOutput::Raw(entries.into_iter().map(raw_entry).collect())
        })
    }

    /// The shared stage sequence. Exactly one connection per call,
    /// released on every exit path.
    async fn run(
        &self,
        username: &str,
        password: &str,
        filter: &str,
        attributes: &[String],
        sort_key: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>> {
        let controller = self.selector.select_live().await?;
        let principal = format!("{}{}", self.config.rdn_prefix, username);

        let session = Session::establish(
            &self.connector,
            controller,
            Some(self.config.query_port()),
        )
        .await?;
        let session = session.bind(&principal, password).await?;
        let session = session.search(&self.config.base_dn, filter, attributes).await?;
        let session = session.sort(sort_key).await?;
        let (entries, session) = session.fetch().await?;

        // Cleanup failure is logged inside close() and never overturns
        // a result that was already fetched.
        let _ = session.close().await;

        debug!(filter, count = entries.len(), "directory query finished");
        Ok(entries)
    }
}

fn raw_entry(entry: DirectoryEntry) -> HashMap<String, Vec<String>> {
    let mut map = entry.attrs;
    map.insert("dn".to_string(), vec![entry.dn]);
    map
}

/// Per-call session state, parameterized by pipeline stage.
struct Session<C: DirectoryConnection, S> {
    conn: C,
    controller: SelectedController,
    stage: S,
}

struct Connected;
struct Bound;
struct Searched {
    result: SearchResult,
}
struct Sorted {
    result: SearchResult,
}
struct Fetched;

/// Best-effort release of a connection on an abort path.
async fn release<C: DirectoryConnection>(mut conn: C) {
    if let Err(error) = conn.unbind().await {
        warn!(%error, "failed to release directory connection after aborted call");
    }
}

impl<C: DirectoryConnection> Session<C, Connected> {
    async fn establish<K>(
        connector: &K,
        controller: SelectedController,
        port: Option<u16>,
    ) -> Result<Self>
    where
        K: DirectoryConnector<Conn = C>,
    {
        match connector.connect(&controller.hostname, port).await {
            Ok(conn) => Ok(Session {
                conn,
                controller,
                stage: Connected,
            }),
            Err(error) => {
                warn!(controller = %controller.hostname, %error, "directory connection failed");
                Err(Error::BindFailure)
            }
        }
    }

    async fn bind(self, principal: &str, password: &str) -> Result<Session<C, Bound>> {
        let Session {
            mut conn,
            controller,
            ..
        } = self;

        if let Err(error) = conn.bind(principal, password).await {
            if error.is_invalid_credentials() {
                debug!(controller = %controller.hostname, "directory rejected credentials");
            } else {
                warn!(controller = %controller.hostname, %error, "directory bind failed");
            }
            release(conn).await;
            return Err(Error::BindFailure);
        }

        Ok(Session {
            conn,
            controller,
            stage: Bound,
        })
    }
}

impl<C: DirectoryConnection> Session<C, Bound> {
    async fn search(
        self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Session<C, Searched>> {
        let Session {
            mut conn,
            controller,
            ..
        } = self;

        match conn.search(base_dn, filter, attributes).await {
            Ok(result) => Ok(Session {
                conn,
                controller,
                stage: Searched { result },
            }),
            Err(error) => {
                warn!(controller = %controller.hostname, filter, %error, "directory search failed");
                release(conn).await;
                Err(Error::SearchFailure)
            }
        }
    }
}

impl<C: DirectoryConnection> Session<C, Searched> {
    async fn sort(self, key: Option<&str>) -> Result<Session<C, Sorted>> {
        let Session {
            mut conn,
            controller,
            stage: Searched { mut result },
        } = self;

        if let Some(key) = key {
            if let Err(error) = conn.sort(&mut result, key) {
                warn!(controller = %controller.hostname, key, %error, "directory sort failed");
                release(conn).await;
                return Err(Error::SortFailure);
            }
        }

        Ok(Session {
            conn,
            controller,
            stage: Sorted { result },
        })
    }
}

impl<C: DirectoryConnection> Session<C, Sorted> {
    async fn fetch(self) -> Result<(Vec<DirectoryEntry>, Session<C, Fetched>)> {
        let Session {
            mut conn,
            controller,
            stage: Sorted { result },
        } = self;

        match conn.entries(result) {
            Ok(entries) => Ok((
                entries,
                Session {
                    conn,
                    controller,
                    stage: Fetched,
                },
            )),
            Err(error) => {
                warn!(controller = %controller.hostname, %error, "failed to read search entries");
                release(conn).await;
                Err(Error::FetchFailure)
            }
        }
    }
}

impl<C: DirectoryConnection> Session<C, Fetched> {
    async fn close(self) -> Result<()> {
        let Session {
            mut conn,
            controller,
            ..
        } = self;

        if let Err(error) = conn.unbind().await {
            warn!(controller = %controller.hostname, %error, "unbind failed after completed call");
            return Err(Error::UnbindFailure);
        }
        Ok(())
    }
}
