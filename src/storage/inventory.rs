//! Host inventory: the recorded baseline a scan is reconciled against.
//!
//! The file format is a flat JSON array of host records:
//!
//! ```json
//! [{"name": "web", "address": "10.0.0.5", "ports": [22, 80], "platform": "Linux"}]
//! ```

use crate::error::{StorageError, StorageResult};
use crate::types::Host;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read access to the recorded hosts.
///
/// Reconciliation never writes through this trait, so concurrent readers
/// are safe.
pub trait InventoryStore: Send + Sync {
    /// Exact-match lookup by address.
    fn find_by_address(&self, address: &str) -> Option<Host>;

    /// Every recorded host whose address is not in `addresses`.
    fn find_by_address_not_in(&self, addresses: &HashSet<String>) -> Vec<Host>;

    /// Every recorded host.
    fn find_all(&self) -> Vec<Host>;
}

/// Inventory held in memory, optionally loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct JsonInventory {
    source: Option<PathBuf>,
    hosts: Vec<Host>,
}

impl JsonInventory {
    /// Build an inventory from host records directly.
    pub fn from_hosts(hosts: Vec<Host>) -> Self {
        Self {
            source: None,
            hosts,
        }
    }

    /// Load an inventory file.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading inventory");

        let content = fs::read_to_string(path).map_err(|e| StorageError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let hosts: Vec<Host> =
            serde_json::from_str(&content).map_err(|e| StorageError::InvalidFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        debug!(hosts = hosts.len(), "inventory loaded");
        Ok(Self {
            source: Some(path.to_path_buf()),
            hosts,
        })
    }

    /// The file this inventory was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl InventoryStore for JsonInventory {
    fn find_by_address(&self, address: &str) -> Option<Host> {
        self.hosts.iter().find(|h| h.address() == address).cloned()
    }

    fn find_by_address_not_in(&self, addresses: &HashSet<String>) -> Vec<Host> {
        self.hosts
            .iter()
            .filter(|h| !addresses.contains(h.address()))
            .cloned()
            .collect()
    }

    fn find_all(&self) -> Vec<Host> {
        self.hosts.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;
    use std::io::Write;

    fn write_inventory(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_and_lookup() {
        let file = write_inventory(
            r#"[
                {"name": "web", "address": "10.0.0.5", "ports": [22, 80], "platform": "Linux"},
                {"name": "db", "address": "10.0.0.6", "ports": []}
            ]"#,
        );
        let inventory = JsonInventory::load(file.path()).unwrap();
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.source(), Some(file.path()));

        let web = inventory.find_by_address("10.0.0.5").unwrap();
        assert_eq!(web.name(), "web");
        assert_eq!(web.platform(), Some("Linux"));
        assert!(web.has_port(Port::new(80).unwrap()));

        assert!(inventory.find_by_address("10.0.0.50").is_none());
    }

    #[test]
    fn test_find_by_address_not_in() {
        let inventory = JsonInventory::from_hosts(vec![
            Host::new("10.0.0.1", []),
            Host::new("10.0.0.2", []),
            Host::new("10.0.0.3", []),
        ]);
        let seen: HashSet<String> = ["10.0.0.2".to_string()].into_iter().collect();

        let missing: Vec<String> = inventory
            .find_by_address_not_in(&seen)
            .iter()
            .map(|h| h.address().to_string())
            .collect();
        assert_eq!(missing, vec!["10.0.0.1", "10.0.0.3"]);
    }

    #[test]
    fn test_missing_file() {
        let result = JsonInventory::load("/nonexistent/inventory.json");
        assert!(matches!(result, Err(StorageError::LoadFailed { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_inventory(r#"[{"name": "x", "ports": [22]}]"#);
        let result = JsonInventory::load(file.path());
        assert!(matches!(result, Err(StorageError::InvalidFormat { .. })));
    }
}
