//! User enumeration on discovered hosts.
//!
//! Strategies are tried in registration order and the first one whose
//! `supports` predicate accepts the host does the work. A failure on one
//! host is recorded and the batch moves on.

pub mod ssh;

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::storage::Capability;
use crate::types::Host;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub use ssh::{Ssh2Connector, SshConnector, SshLinuxUserDiscovery, SshSession, SSH, SSH_LINUX};

/// A way of listing the login names on a host.
#[async_trait]
pub trait UserDiscovery: Send + Sync {
    /// Capability this strategy runs as; also keys credential lookup.
    fn capability(&self) -> Capability;

    fn supports(&self, host: &Host) -> bool;

    /// One login name per line of remote output. A trailing delimiter may
    /// leave an empty last entry.
    async fn discover_users(&self, host: &Host) -> DiscoveryResult<Vec<String>>;
}

/// Per-host result of user enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UserDiscoveryOutcome {
    Found {
        address: String,
        capability: String,
        users: Vec<String>,
    },
    Failed {
        address: String,
        error: String,
    },
}

impl UserDiscoveryOutcome {
    pub fn address(&self) -> &str {
        match self {
            Self::Found { address, .. } | Self::Failed { address, .. } => address,
        }
    }
}

/// Picks and runs the first matching strategy for each host.
#[derive(Default)]
pub struct UserDiscoveryDispatcher {
    strategies: Vec<Arc<dyn UserDiscovery>>,
}

impl UserDiscoveryDispatcher {
    pub fn new(strategies: Vec<Arc<dyn UserDiscovery>>) -> Self {
        Self { strategies }
    }

    pub fn register(&mut self, strategy: Arc<dyn UserDiscovery>) {
        self.strategies.push(strategy);
    }

    /// The first registered strategy that supports `host`.
    pub fn select(&self, host: &Host) -> DiscoveryResult<&dyn UserDiscovery> {
        self.strategies
            .iter()
            .find(|s| s.supports(host))
            .map(|s| s.as_ref())
            .ok_or_else(|| DiscoveryError::NoStrategyAvailable(host.address().to_string()))
    }

    pub fn supports(&self, host: &Host) -> bool {
        self.select(host).is_ok()
    }

    /// Enumerate users on one host with the first matching strategy.
    pub async fn discover_users(&self, host: &Host) -> DiscoveryResult<Vec<String>> {
        self.select(host)?.discover_users(host).await
    }

    /// Enumerate users on every host some strategy supports.
    ///
    /// Hosts without a matching strategy are skipped. Empty names from
    /// trailing delimiters are dropped.
    pub async fn discover_all(&self, hosts: &[Host]) -> Vec<UserDiscoveryOutcome> {
        let mut outcomes = Vec::new();

        for host in hosts {
            let Ok(strategy) = self.select(host) else {
                continue;
            };

            let outcome = match strategy.discover_users(host).await {
                Ok(users) => {
                    let users: Vec<String> = users.into_iter().filter(|u| !u.is_empty()).collect();
                    info!(address = host.address(), users = users.len(), "users discovered");
                    UserDiscoveryOutcome::Found {
                        address: host.address().to_string(),
                        capability: strategy.capability().name().to_string(),
                        users,
                    }
                }
                Err(e) => {
                    warn!(address = host.address(), error = %e, "user discovery failed");
                    UserDiscoveryOutcome::Failed {
                        address: host.address().to_string(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
