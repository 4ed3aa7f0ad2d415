//! The host record shared by scanning, inventory and reconciliation.

use super::port::Port;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Display label for hosts with no recorded name.
pub const UNKNOWN_NAME: &str = "Unknown";

fn default_name() -> String {
    UNKNOWN_NAME.to_string()
}

/// A host and the set of TCP ports it accepts connections on.
///
/// Identity is the address alone: two records with the same address are
/// equal even if their names, ports or platforms differ. Records are built
/// once and never mutated; the `with_*` methods return new values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    #[serde(default = "default_name")]
    name: String,
    address: String,
    #[serde(default)]
    ports: BTreeSet<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platform: Option<String>,
}

impl Host {
    /// Create a host with the default name and no platform tag.
    pub fn new(address: impl Into<String>, ports: impl IntoIterator<Item = Port>) -> Self {
        Self {
            name: default_name(),
            address: address.into(),
            ports: ports.into_iter().collect(),
            platform: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn ports(&self) -> &BTreeSet<Port> {
        &self.ports
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn has_port(&self, port: Port) -> bool {
        self.ports.contains(&port)
    }

    /// The SSH port, if it was found open.
    pub fn ssh_port(&self) -> Option<Port> {
        self.has_port(Port::SSH).then_some(Port::SSH)
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Host {}

impl Hash for Host {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ports: Vec<String> = self.ports.iter().map(|p| p.to_string()).collect();
        write!(f, "{} ({}:[{}])", self.name, self.address, ports.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(n: u16) -> Port {
        Port::new(n).unwrap()
    }

    #[test]
    fn test_defaults() {
        let host = Host::new("10.0.0.5", [port(80), port(22), port(80)]);
        assert_eq!(host.name(), "Unknown");
        assert_eq!(host.platform(), None);
        assert_eq!(host.ports().len(), 2);
        assert_eq!(host.ssh_port(), Some(Port::SSH));
    }

    #[test]
    fn test_identity_is_address_only() {
        let a = Host::new("10.0.0.5", [port(22)]).with_name("web");
        let b = Host::new("10.0.0.5", []).with_platform(Some("Linux".into()));
        let c = Host::new("10.0.0.6", [port(22)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_inventory_record_deserialization() {
        let host: Host =
            serde_json::from_str(r#"{"address": "10.0.0.1", "ports": [443, 22, 22]}"#).unwrap();
        assert_eq!(host.name(), UNKNOWN_NAME);
        assert_eq!(
            host.ports().iter().copied().collect::<Vec<_>>(),
            vec![port(22), port(443)]
        );
        assert!(host.ssh_port().is_some());
    }

    #[test]
    fn test_display() {
        let host = Host::new("10.0.0.9", [port(80), port(22)]).with_name("db");
        assert_eq!(host.to_string(), "db (10.0.0.9:[22,80])");
    }
}
