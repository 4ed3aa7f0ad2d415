//! Scan subcommand implementation.
//!
//! Handles `driftscan scan <targets>`: scan, reconcile against the
//! inventory, optionally enumerate users, and print the report.

use crate::cli::OutputFormat;
use crate::config::{AppSettings, Paths};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::scanner::{CoordinatorConfig, LivenessMode, ScanCoordinator, ScanRequest};
use crate::storage::{JsonCredentialStore, JsonInventory};
use crate::types::{resolve_all, PortSpec, TargetSpec};
use crate::users::{Ssh2Connector, SshLinuxUserDiscovery, UserDiscoveryDispatcher};
use crate::workflow::Workflow;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Scan targets and reconcile against the inventory.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Targets to scan, comma separated (IP, hostname, or CIDR notation)
    ///
    /// Examples:
    ///   192.168.1.1                 Single IP address
    ///   example.com                 Hostname
    ///   192.168.1.0/24,10.0.0.5     CIDR range and a single address
    #[arg(value_name = "TARGETS")]
    pub targets: String,

    /// Ports to scan (e.g., "22", "22,80", "1-1024", "22,80:90")
    #[arg(short, long, default_value = "1-1024")]
    pub ports: String,

    /// Per-probe timeout in seconds (at least 1)
    #[arg(short = 't', long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Inventory file to reconcile against
    #[arg(long, value_name = "PATH")]
    pub inventory: Option<PathBuf>,

    /// Credentials file for user discovery
    #[arg(long, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Enumerate login names on discovered hosts
    #[arg(long)]
    pub users: bool,

    /// Platform assumed for every discovered host (e.g., "Linux")
    #[arg(long, value_name = "NAME")]
    pub platform: Option<String>,

    /// Skip the ICMP liveness check and probe every address
    #[arg(long)]
    pub no_ping: bool,

    /// Maximum number of hosts scanned at once
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Maximum number of port probes in flight
    #[arg(long)]
    pub port_concurrency: Option<usize>,

    /// Rate limit in probes per second (0 = unlimited)
    #[arg(short = 'r', long = "rate")]
    pub rate_limit: Option<u32>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, paths: &Paths, settings: &AppSettings, quiet: bool) -> CliResult<()> {
        // Malformed expressions abort before anything touches the network.
        let targets = TargetSpec::parse_list(&self.targets)?;
        let port_spec: PortSpec = self.ports.parse()?;
        if port_spec.is_empty() {
            return Err(CliError::InvalidInput("no ports specified".to_string()));
        }
        let timeout_secs = self.timeout.unwrap_or(settings.timeout_secs);
        if timeout_secs == 0 {
            return Err(CliError::InvalidInput(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        let estimated: u128 = targets.iter().map(TargetSpec::estimated_host_count).sum();
        debug!(targets = targets.len(), estimated, ports = port_spec.count(), "expressions parsed");

        let addresses = resolve_all(&targets).await?;
        if addresses.is_empty() {
            return Err(CliError::InvalidInput("no addresses resolved".to_string()));
        }

        let timeout = Duration::from_secs(timeout_secs);
        let interactive = !quiet && self.output == OutputFormat::Plain && self.output_file.is_none();

        let mut config = CoordinatorConfig::default()
            .with_host_concurrency(self.concurrency.unwrap_or(settings.host_concurrency))
            .with_port_concurrency(self.port_concurrency.unwrap_or(settings.port_concurrency))
            .with_rate_limit(self.rate_limit.unwrap_or(settings.rate_limit));
        if interactive {
            config = config.with_progress();
        }

        let mode = if self.no_ping {
            LivenessMode::Skip
        } else {
            settings.liveness
        };
        let coordinator = ScanCoordinator::with_mode(mode, config)?;

        let inventory_path = self
            .inventory
            .clone()
            .unwrap_or_else(|| settings.inventory_file(paths));
        let inventory = load_inventory(&inventory_path, self.inventory.is_some())?;

        let mut workflow =
            Workflow::new(coordinator, Arc::new(inventory)).with_platform(self.platform.clone());

        if self.users {
            let credentials_path = self
                .credentials
                .clone()
                .unwrap_or_else(|| settings.credentials_file(paths));
            let credentials = load_credentials(&credentials_path, self.credentials.is_some())?;

            let strategy = SshLinuxUserDiscovery::new(
                Arc::new(credentials),
                Arc::new(Ssh2Connector::new(timeout)),
            );
            workflow =
                workflow.with_user_discovery(UserDiscoveryDispatcher::new(vec![Arc::new(strategy)]));
        }

        if interactive {
            output::print_run_header(&self.targets, addresses.len(), port_spec.count());
        }

        let request = ScanRequest::new(addresses, port_spec.ranges().to_vec()).with_timeout(timeout);
        let report = workflow.run(&request).await;

        output::emit_report(&report, self.output, self.output_file.as_deref())?;

        if !quiet {
            if let Some(path) = &self.output_file {
                output::print_info(&format!("Report written to {}", path.display()));
            }
        }

        Ok(())
    }
}

/// An explicitly named file must exist; the default location may be absent.
fn load_inventory(path: &Path, explicit: bool) -> CliResult<JsonInventory> {
    if !explicit && !path.exists() {
        warn!(path = %path.display(), "no inventory file, every host will be reported as new");
        return Ok(JsonInventory::default());
    }
    Ok(JsonInventory::load(path)?)
}

fn load_credentials(path: &Path, explicit: bool) -> CliResult<JsonCredentialStore> {
    if !explicit && !path.exists() {
        warn!(path = %path.display(), "no credentials file, user discovery will fail");
        return Ok(JsonCredentialStore::default());
    }
    Ok(JsonCredentialStore::load(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_default_inventory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = load_inventory(&dir.path().join("inventory.json"), false).unwrap();
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_missing_explicit_inventory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_inventory(&dir.path().join("inventory.json"), true),
            Err(CliError::Storage(_))
        ));
    }

    #[test]
    fn test_explicit_credentials_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Ssh": {{"10.0.0.5": {{"username": "audit"}}}}}}"#).unwrap();
        assert!(load_credentials(file.path(), true).is_ok());
    }

    #[tokio::test]
    async fn test_bad_port_expression_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            config_dir: dir.path().to_path_buf(),
        };
        let cmd = ScanCommand::try_parse_from(["scan", "10.0.0.5", "-p", "80-22"]).unwrap();
        let result = cmd.execute(&paths, &AppSettings::default(), true).await;
        assert!(matches!(result, Err(CliError::Port(_))));
    }

    #[tokio::test]
    async fn test_bad_target_expression_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            config_dir: dir.path().to_path_buf(),
        };
        let cmd = ScanCommand::try_parse_from(["scan", "10.0.0.0/99", "-p", "22"]).unwrap();
        let result = cmd.execute(&paths, &AppSettings::default(), true).await;
        assert!(matches!(result, Err(CliError::Target(_))));
    }

    #[tokio::test]
    async fn test_zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            config_dir: dir.path().to_path_buf(),
        };
        let cmd = ScanCommand::try_parse_from(["scan", "10.0.0.5", "-p", "22", "-t", "0"]).unwrap();
        let result = cmd.execute(&paths, &AppSettings::default(), true).await;
        assert!(matches!(result, Err(CliError::InvalidInput(msg)) if msg.contains("timeout")));
    }

    #[tokio::test]
    async fn test_zero_timeout_from_settings_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            config_dir: dir.path().to_path_buf(),
        };
        let settings = AppSettings {
            timeout_secs: 0,
            ..AppSettings::default()
        };
        let cmd = ScanCommand::try_parse_from(["scan", "10.0.0.5", "-p", "22"]).unwrap();
        let result = cmd.execute(&paths, &settings, true).await;
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }
}
