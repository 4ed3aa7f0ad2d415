//! Inventory reconciliation: diff discovered hosts against the recorded
//! baseline.
//!
//! Every discovered address lands in exactly one of `matches` or `new`;
//! every recorded address that was not discovered lands in `missing`.
//! Port drift inside a match is plain set difference, so the result does
//! not depend on probe completion order.

use crate::storage::InventoryStore;
use crate::types::{Host, Port};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// A discovered host that is also in the inventory.
///
/// An entry exists even when nothing drifted; empty diffs mean no drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostMatch {
    /// Name recorded in the inventory.
    pub name: String,
    pub address: String,
    /// Ports observed open in this run.
    pub ports: BTreeSet<Port>,
    /// Open now but not recorded.
    #[serde(rename = "portsAdded", skip_serializing_if = "BTreeSet::is_empty")]
    pub ports_added: BTreeSet<Port>,
    /// Recorded but not open now.
    #[serde(rename = "portsRemoved", skip_serializing_if = "BTreeSet::is_empty")]
    pub ports_removed: BTreeSet<Port>,
}

impl HostMatch {
    fn compare(expected: &Host, actual: &Host) -> Self {
        Self {
            name: expected.name().to_string(),
            address: actual.address().to_string(),
            ports: actual.ports().clone(),
            ports_added: actual.ports().difference(expected.ports()).copied().collect(),
            ports_removed: expected.ports().difference(actual.ports()).copied().collect(),
        }
    }

    pub fn has_drift(&self) -> bool {
        !self.ports_added.is_empty() || !self.ports_removed.is_empty()
    }
}

/// The structured difference between a scan and the inventory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationDelta {
    #[serde(rename = "hosts")]
    pub matches: Vec<HostMatch>,
    #[serde(rename = "new")]
    pub new_hosts: Vec<Host>,
    #[serde(rename = "missing")]
    pub missing_hosts: Vec<Host>,
}

/// Counts for a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeltaSummary {
    pub matched: usize,
    pub drifted: usize,
    pub new: usize,
    pub missing: usize,
}

impl ReconciliationDelta {
    pub fn summary(&self) -> DeltaSummary {
        DeltaSummary {
            matched: self.matches.len(),
            drifted: self.matches.iter().filter(|m| m.has_drift()).count(),
            new: self.new_hosts.len(),
            missing: self.missing_hosts.len(),
        }
    }

    /// True when the network looks exactly like the inventory.
    pub fn is_clean(&self) -> bool {
        self.new_hosts.is_empty()
            && self.missing_hosts.is_empty()
            && self.matches.iter().all(|m| !m.has_drift())
    }
}

/// Diffs discovered hosts against an inventory.
pub struct ReconciliationEngine {
    inventory: Arc<dyn InventoryStore>,
}

impl ReconciliationEngine {
    pub fn new(inventory: Arc<dyn InventoryStore>) -> Self {
        Self { inventory }
    }

    /// Build the delta for one scan batch.
    ///
    /// Needs the whole batch: the missing bucket is everything recorded
    /// that the batch did not contain. Buckets are sorted by address so the
    /// same inputs always give the same output.
    pub fn reconcile(&self, discovered: &[Host]) -> ReconciliationDelta {
        let mut delta = ReconciliationDelta::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(discovered.len());

        for host in discovered {
            if !seen.insert(host.address().to_string()) {
                debug!(address = host.address(), "duplicate discovered address ignored");
                continue;
            }

            match self.inventory.find_by_address(host.address()) {
                Some(expected) => {
                    let entry = HostMatch::compare(&expected, host);
                    if !entry.ports_removed.is_empty() {
                        info!(
                            address = host.address(),
                            name = expected.name(),
                            ports = ?entry.ports_removed,
                            "expected ports are not found"
                        );
                    }
                    if !entry.ports_added.is_empty() {
                        info!(
                            address = host.address(),
                            name = expected.name(),
                            ports = ?entry.ports_added,
                            "additional ports found"
                        );
                    }
                    delta.matches.push(entry);
                }
                None => {
                    info!(host = %host, "new host found");
                    delta.new_hosts.push(host.clone());
                }
            }
        }

        delta.missing_hosts = self.inventory.find_by_address_not_in(&seen);
        for host in &delta.missing_hosts {
            info!(host = %host, "host not found");
        }

        delta.matches.sort_by(|a, b| by_address(&a.address, &b.address));
        delta.new_hosts.sort_by(|a, b| by_address(a.address(), b.address()));
        delta
            .missing_hosts
            .sort_by(|a, b| by_address(a.address(), b.address()));

        delta
    }
}

/// Numeric order for IP addresses, lexical order for anything else.
pub(crate) fn by_address(a: &str, b: &str) -> Ordering {
    let key = |s: &str| s.parse::<IpAddr>().ok();
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonInventory;

    fn ports(list: &[u16]) -> Vec<Port> {
        list.iter().map(|&p| Port::new(p).unwrap()).collect()
    }

    fn set(list: &[u16]) -> BTreeSet<Port> {
        ports(list).into_iter().collect()
    }

    fn engine(hosts: Vec<Host>) -> ReconciliationEngine {
        ReconciliationEngine::new(Arc::new(JsonInventory::from_hosts(hosts)))
    }

    #[test]
    fn test_port_drift() {
        let engine = engine(vec![
            Host::new("10.0.0.5", ports(&[22, 80, 443])).with_name("web"),
        ]);
        let delta = engine.reconcile(&[Host::new("10.0.0.5", ports(&[22, 80, 8080]))]);

        assert_eq!(delta.matches.len(), 1);
        let entry = &delta.matches[0];
        assert_eq!(entry.name, "web");
        assert_eq!(entry.ports, set(&[22, 80, 8080]));
        assert_eq!(entry.ports_removed, set(&[443]));
        assert_eq!(entry.ports_added, set(&[8080]));
        assert!(entry.has_drift());
    }

    #[test]
    fn test_match_without_drift_still_reported() {
        let engine = engine(vec![Host::new("10.0.0.5", ports(&[22]))]);
        let delta = engine.reconcile(&[Host::new("10.0.0.5", ports(&[22]))]);

        assert_eq!(delta.matches.len(), 1);
        assert!(!delta.matches[0].has_drift());
        assert!(delta.is_clean());
    }

    #[test]
    fn test_empty_expected_ports_still_match() {
        let engine = engine(vec![Host::new("10.0.0.7", [])]);
        let delta = engine.reconcile(&[Host::new("10.0.0.7", [])]);

        assert_eq!(delta.matches.len(), 1);
        assert!(delta.new_hosts.is_empty());
        assert!(delta.missing_hosts.is_empty());
    }

    #[test]
    fn test_partition_of_addresses() {
        let engine = engine(vec![
            Host::new("10.0.0.1", ports(&[22])),
            Host::new("10.0.0.2", ports(&[80])),
        ]);
        let discovered = vec![
            Host::new("10.0.0.2", ports(&[80])),
            Host::new("10.0.0.3", ports(&[443])),
        ];
        let delta = engine.reconcile(&discovered);

        let mut buckets: Vec<String> = delta
            .matches
            .iter()
            .map(|m| m.address.clone())
            .chain(delta.new_hosts.iter().map(|h| h.address().to_string()))
            .chain(delta.missing_hosts.iter().map(|h| h.address().to_string()))
            .collect();
        buckets.sort();
        assert_eq!(buckets, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(delta.summary().new, 1);
        assert_eq!(delta.summary().missing, 1);
    }

    #[test]
    fn test_duplicate_discovered_address_counted_once() {
        let engine = engine(vec![]);
        let delta = engine.reconcile(&[
            Host::new("10.0.0.9", ports(&[22])),
            Host::new("10.0.0.9", ports(&[80])),
        ]);
        assert_eq!(delta.new_hosts.len(), 1);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let engine = engine(vec![
            Host::new("10.0.0.1", ports(&[22])),
            Host::new("10.0.0.5", ports(&[22, 80])),
        ]);
        let forward = vec![
            Host::new("10.0.0.10", ports(&[22])),
            Host::new("10.0.0.5", ports(&[443, 80])),
            Host::new("10.0.0.9", ports(&[])),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let first = serde_json::to_value(engine.reconcile(&forward)).unwrap();
        let second = serde_json::to_value(engine.reconcile(&forward)).unwrap();
        let reversed = serde_json::to_value(engine.reconcile(&backward)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, reversed);
    }

    #[test]
    fn test_numeric_address_order() {
        assert_eq!(by_address("10.0.0.9", "10.0.0.10"), Ordering::Less);
        assert_eq!(by_address("10.0.0.10", "10.0.0.9"), Ordering::Greater);
    }

    #[test]
    fn test_serialized_shape() {
        let engine = engine(vec![Host::new("10.0.0.5", ports(&[22]))]);
        let delta = engine.reconcile(&[Host::new("10.0.0.5", ports(&[22]))]);
        let value = serde_json::to_value(&delta).unwrap();

        let entry = &value["hosts"][0];
        assert_eq!(entry["address"], "10.0.0.5");
        assert_eq!(entry["ports"], serde_json::json!([22]));
        assert!(entry.get("portsAdded").is_none());
        assert!(entry.get("portsRemoved").is_none());
        assert_eq!(value["new"], serde_json::json!([]));
        assert_eq!(value["missing"], serde_json::json!([]));
    }
}
