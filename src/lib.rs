//! # driftscan - network discovery and inventory reconciliation
//!
//! driftscan sweeps address ranges for reachable hosts and open TCP ports,
//! compares what it found with a recorded inventory, and can list the login
//! names on hosts it knows how to reach.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use driftscan::scanner::{CoordinatorConfig, LivenessMode, ScanCoordinator, ScanRequest};
//! use driftscan::storage::JsonInventory;
//! use driftscan::workflow::Workflow;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let coordinator = ScanCoordinator::with_mode(LivenessMode::Skip, CoordinatorConfig::default())?;
//!     let inventory = JsonInventory::load("inventory.json")?;
//!     let workflow = Workflow::new(coordinator, Arc::new(inventory));
//!
//!     let request = ScanRequest::new(vec!["10.0.0.5".parse()?], vec!["22:22".parse()?]);
//!     let report = workflow.run(&request).await;
//!     println!("{:?}", report.delta.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, hosts, targets and run identifiers
//! - [`scanner`] - Liveness and port probes and the scan coordinator
//! - [`storage`] - Inventory and credential stores
//! - [`reconcile`] - Diffing discovered hosts against the inventory
//! - [`users`] - User enumeration strategies
//! - [`workflow`] - One end-to-end run and its report
//! - [`config`] - Settings and paths
//! - [`output`] - Report formatting
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod reconcile;
pub mod scanner;
pub mod storage;
pub mod types;
pub mod users;
pub mod workflow;

// Re-export commonly used types
pub use error::{CliError, DiscoveryError, ScanError, StorageError};
pub use reconcile::{ReconciliationDelta, ReconciliationEngine};
pub use scanner::{ScanCoordinator, ScanRequest};
pub use types::{Host, Port, PortRange, PortSpec, RunId, TargetSpec};
pub use workflow::{RunReport, Workflow};
