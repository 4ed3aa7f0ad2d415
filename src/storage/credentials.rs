//! Credential lookup keyed by capability and host address.
//!
//! The file maps a capability name to a map of host address to an opaque
//! parameter object:
//!
//! ```json
//! {"Ssh": {"10.0.0.5": {"username": "audit", "password": "..."}}}
//! ```
//!
//! Parameters are handed to the transport untouched.

use crate::error::{DiscoveryError, DiscoveryResult, StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A named role used both to pick a user-discovery strategy and to key
/// credential lookup.
///
/// `lookup_chain` lists the names credentials may be registered under,
/// most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    name: &'static str,
    lookup_chain: &'static [&'static str],
}

impl Capability {
    pub const fn new(name: &'static str, lookup_chain: &'static [&'static str]) -> Self {
        Self { name, lookup_chain }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn lookup_chain(&self) -> &'static [&'static str] {
        self.lookup_chain
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Opaque authentication parameters.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRecord(Map<String, Value>);

impl CredentialRecord {
    pub fn new(params: Map<String, Value>) -> Self {
        Self(params)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Decode the parameters into a transport-specific type.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }
}

// Keys only; values are secrets.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Resolves credentials for a capability at a host.
pub trait CredentialResolver: Send + Sync {
    /// Walk the capability's lookup chain and return the first non-empty
    /// record registered for `address`.
    fn resolve(&self, capability: &Capability, address: &str) -> DiscoveryResult<CredentialRecord>;
}

/// Credentials loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct JsonCredentialStore {
    items: HashMap<String, HashMap<String, Option<CredentialRecord>>>,
}

impl JsonCredentialStore {
    /// Load a credentials file.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading credentials data");

        let content = fs::read_to_string(path).map_err(|e| StorageError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let items = serde_json::from_str(&content).map_err(|e| StorageError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self { items })
    }

    /// Register a record. Mainly for embedding and tests.
    pub fn insert(
        &mut self,
        capability: impl Into<String>,
        address: impl Into<String>,
        record: CredentialRecord,
    ) {
        self.items
            .entry(capability.into())
            .or_default()
            .insert(address.into(), Some(record));
    }
}

impl CredentialResolver for JsonCredentialStore {
    fn resolve(&self, capability: &Capability, address: &str) -> DiscoveryResult<CredentialRecord> {
        for name in capability.lookup_chain() {
            let record = self
                .items
                .get(*name)
                .and_then(|hosts| hosts.get(address))
                .and_then(Option::as_ref)
                .filter(|record| !record.is_empty());

            if let Some(record) = record {
                debug!(capability = %capability, registered_as = name, address, "credentials resolved");
                return Ok(record.clone());
            }
        }

        Err(DiscoveryError::CredentialsNotFound {
            capability: capability.name().to_string(),
            address: address.to_string(),
        })
    }
}
