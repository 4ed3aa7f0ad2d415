//! CLI subcommand definitions and handlers.
//!
//! - `driftscan scan <targets>` - Scan and reconcile against the inventory
//! - `driftscan inventory` - Show the recorded inventory

mod inventory;
mod scan;

pub use inventory::InventoryCommand;
pub use scan::ScanCommand;

use crate::config::{AppSettings, Paths};
use crate::error::CliResult;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// driftscan - find hosts and open ports, and compare them with what you
/// expected to find.
#[derive(Parser, Debug)]
#[command(name = "driftscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Network discovery and inventory drift detection", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a settings file
    #[arg(long, global = true, value_name = "PATH", env = "DRIFTSCAN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan targets and reconcile the result against the inventory
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Show the recorded inventory
    #[command(alias = "i")]
    Inventory(InventoryCommand),
}

impl Cli {
    /// Resolve directories and settings, then run the chosen subcommand.
    pub async fn execute(&self) -> CliResult<()> {
        let paths = Paths::discover()?;
        let settings = match &self.config {
            Some(path) => AppSettings::load_from(path)?,
            None => AppSettings::load(&paths)?,
        };

        match &self.command {
            Commands::Scan(cmd) => cmd.execute(&paths, &settings, self.quiet).await,
            Commands::Inventory(cmd) => cmd.execute(&paths, &settings),
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from([
            "driftscan",
            "-v",
            "scan",
            "10.0.0.0/30,10.0.1.5",
            "-p",
            "22,80-81",
            "--users",
            "--no-ping",
            "-o",
            "json",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Scan(scan) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(scan.targets, "10.0.0.0/30,10.0.1.5");
        assert_eq!(scan.ports, "22,80-81");
        assert!(scan.users);
        assert!(scan.no_ping);
        assert_eq!(scan.output, OutputFormat::Json);
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["driftscan", "-v", "-q", "inventory"]).is_err());
    }
}
