//! One end-to-end run: scan, reconcile, then optionally enumerate users.

use crate::reconcile::{by_address, ReconciliationDelta, ReconciliationEngine};
use crate::scanner::{HostScanFailure, ScanCoordinator, ScanRequest};
use crate::storage::InventoryStore;
use crate::types::{Host, RunId};
use crate::users::{UserDiscoveryDispatcher, UserDiscoveryOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of addresses handed to the scanner.
    pub addresses_scanned: usize,
    pub delta: ReconciliationDelta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scan_failures: Vec<HostScanFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<UserDiscoveryOutcome>,
}

impl RunReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Wires the scanner, the inventory and user discovery together.
pub struct Workflow {
    coordinator: ScanCoordinator,
    inventory: Arc<dyn InventoryStore>,
    users: Option<UserDiscoveryDispatcher>,
    platform: Option<String>,
}

impl Workflow {
    pub fn new(coordinator: ScanCoordinator, inventory: Arc<dyn InventoryStore>) -> Self {
        Self {
            coordinator,
            inventory,
            users: None,
            platform: None,
        }
    }

    /// Enumerate users on discovered hosts after reconciliation.
    pub fn with_user_discovery(mut self, dispatcher: UserDiscoveryDispatcher) -> Self {
        self.users = Some(dispatcher);
        self
    }

    /// Platform assumed for every discovered host, overriding the inventory.
    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform;
        self
    }

    pub async fn run(&self, request: &ScanRequest) -> RunReport {
        let id = RunId::new();
        let started_at = Utc::now();
        info!(run = %id.short(), addresses = request.addresses.len(), "run started");

        let outcome = self.coordinator.scan(request).await;
        let hosts: Vec<Host> = outcome.hosts.into_iter().map(|h| self.enrich(h)).collect();

        let delta = ReconciliationEngine::new(Arc::clone(&self.inventory)).reconcile(&hosts);

        let mut users = match &self.users {
            Some(dispatcher) => dispatcher.discover_all(&hosts).await,
            None => Vec::new(),
        };
        users.sort_by(|a, b| by_address(a.address(), b.address()));

        let mut scan_failures = outcome.failures;
        scan_failures.sort_by(|a, b| by_address(&a.address, &b.address));

        let report = RunReport {
            id,
            started_at,
            finished_at: Utc::now(),
            addresses_scanned: request.addresses.len(),
            delta,
            scan_failures,
            users,
        };
        info!(
            run = %report.id.short(),
            duration_ms = report.duration_ms(),
            summary = ?report.delta.summary(),
            "run finished"
        );
        report
    }

    /// Carry the recorded name and platform onto a discovered host.
    fn enrich(&self, host: Host) -> Host {
        let recorded = self.inventory.find_by_address(host.address());
        let mut host = match &recorded {
            Some(known) => {
                let platform = known.platform().map(str::to_string);
                host.with_name(known.name()).with_platform(platform)
            }
            None => host,
        };

        if let Some(platform) = &self.platform {
            host = host.with_platform(Some(platform.clone()));
        }
        debug!(host = %host, platform = ?host.platform(), "host enriched");
        host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DiscoveryResult, ScanResult};
    use crate::scanner::{AssumeAlive, CoordinatorConfig, PortProbe};
    use crate::storage::{Capability, JsonInventory};
    use crate::types::{Port, PortRange};
    use crate::users::UserDiscovery;
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::time::Duration;

    struct OpenPorts(Vec<u16>);

    #[async_trait]
    impl PortProbe for OpenPorts {
        async fn probe(&self, _address: IpAddr, port: Port, _timeout: Duration) -> ScanResult<bool> {
            Ok(self.0.contains(&port.as_u16()))
        }
    }

    struct EchoPlatform;

    #[async_trait]
    impl UserDiscovery for EchoPlatform {
        fn capability(&self) -> Capability {
            Capability::new("Echo", &["Echo"])
        }

        fn supports(&self, host: &Host) -> bool {
            host.platform().is_some()
        }

        async fn discover_users(&self, host: &Host) -> DiscoveryResult<Vec<String>> {
            Ok(vec![host.platform().unwrap_or_default().to_string()])
        }
    }

    fn workflow(inventory: Vec<Host>, open: Vec<u16>) -> Workflow {
        let coordinator = ScanCoordinator::new(
            Arc::new(AssumeAlive),
            Arc::new(OpenPorts(open)),
            CoordinatorConfig::default(),
        );
        Workflow::new(coordinator, Arc::new(JsonInventory::from_hosts(inventory)))
    }

    fn request(addresses: &[&str]) -> ScanRequest {
        ScanRequest::new(
            addresses.iter().map(|a| a.parse().unwrap()).collect(),
            vec!["20:25".parse::<PortRange>().unwrap()],
        )
    }

    #[tokio::test]
    async fn test_run_without_user_discovery() {
        let recorded = Host::new("10.0.0.5", [Port::SSH]).with_name("db");
        let report = workflow(vec![recorded], vec![22])
            .run(&request(&["10.0.0.5"]))
            .await;

        assert_eq!(report.addresses_scanned, 1);
        assert!(report.delta.is_clean());
        assert_eq!(report.delta.matches[0].name, "db");
        assert!(report.users.is_empty());
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_platform_comes_from_inventory() {
        let recorded = Host::new("10.0.0.5", [Port::SSH]).with_platform(Some("Linux".into()));
        let report = workflow(vec![recorded], vec![22])
            .with_user_discovery(UserDiscoveryDispatcher::new(vec![Arc::new(EchoPlatform)]))
            .run(&request(&["10.0.0.5", "10.0.0.6"]))
            .await;

        // 10.0.0.6 is not recorded and has no platform, so it is skipped.
        assert_eq!(
            report.users,
            vec![UserDiscoveryOutcome::Found {
                address: "10.0.0.5".into(),
                capability: "Echo".into(),
                users: vec!["Linux".into()],
            }]
        );
        assert_eq!(report.delta.new_hosts.len(), 1);
    }

    #[tokio::test]
    async fn test_platform_override() {
        let report = workflow(vec![], vec![22])
            .with_user_discovery(UserDiscoveryDispatcher::new(vec![Arc::new(EchoPlatform)]))
            .with_platform(Some("BSD".into()))
            .run(&request(&["10.0.0.6"]))
            .await;

        assert_eq!(report.users.len(), 1);
        assert_eq!(report.delta.new_hosts[0].platform(), Some("BSD"));
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let report = workflow(vec![], vec![]).run(&request(&["10.0.0.6"])).await;
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["id"].is_string());
        assert_eq!(value["delta"]["new"][0]["address"], "10.0.0.6");
        assert!(value.get("users").is_none());
    }
}
