//! Domain controller selection
//!
//! Picks a live domain controller out of the configured pool. The pool
//! order is re-randomized on every selection to spread connection load
//! across controllers over time; each candidate gets one short TCP
//! liveness probe. Fail-fast health check only: no caching of failed
//! hosts across calls, no backoff.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};
use warden_core::{DirectoryConfig, Error, Result};

/// The controller chosen for one pipeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedController {
    /// Network address the liveness probe hit.
    pub address: String,
    /// Hostname the directory connection is opened against.
    pub hostname: String,
}

#[derive(Debug, Clone)]
pub struct ControllerSelector {
    pool: Vec<(String, String)>,
    probe_port: u16,
    probe_timeout: Duration,
}

impl ControllerSelector {
    pub fn new(
        controllers: &HashMap<String, String>,
        probe_port: u16,
        probe_timeout: Duration,
    ) -> Self {
        let pool = controllers
            .iter()
            .map(|(address, hostname)| (address.clone(), hostname.clone()))
            .collect();

        Self {
            pool,
            probe_port,
            probe_timeout,
        }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(
            &config.controllers,
            config.probe_port,
            Duration::from_secs(config.probe_timeout_secs),
        )
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Select the first pool member that accepts a TCP connection,
    /// probing in freshly shuffled order.
    ///
    /// Bounded by `pool_size x probe_timeout`; every candidate is
    /// probed at most once per call.
    pub async fn select_live(&self) -> Result<SelectedController> {
        let mut order: Vec<usize> = (0..self.pool.len()).collect();
        order.shuffle(&mut rand::rng());

        for index in order {
            let (address, hostname) = &self.pool[index];
            if self.probe(address).await {
                debug!(%address, controller = %hostname, "selected live domain controller");
                return Ok(SelectedController {
                    address: address.clone(),
                    hostname: hostname.clone(),
                });
            }
            warn!(%address, "domain controller failed liveness probe");
        }

        Err(Error::NoDirectoryServerAvailable)
    }

    /// Raw TCP connect with a short timeout; no protocol exchange. The
    /// probe socket is dropped as soon as the connection is accepted.
    async fn probe(&self, address: &str) -> bool {
        matches!(
            timeout(
                self.probe_timeout,
                TcpStream::connect((address, self.probe_port)),
            )
            .await,
            Ok(Ok(_))
        )
    }
}
