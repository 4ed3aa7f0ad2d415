//! Inventory subcommand: show the recorded baseline.

use crate::cli::OutputFormat;
use crate::config::{AppSettings, Paths};
use crate::error::CliResult;
use crate::storage::{InventoryStore, JsonInventory};
use crate::types::Host;
use clap::Parser;
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;

/// Show the recorded inventory.
#[derive(Parser, Debug)]
pub struct InventoryCommand {
    /// Inventory file to read
    #[arg(long, value_name = "PATH")]
    pub inventory: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl InventoryCommand {
    pub fn execute(&self, paths: &Paths, settings: &AppSettings) -> CliResult<()> {
        let path = self
            .inventory
            .clone()
            .unwrap_or_else(|| settings.inventory_file(paths));
        let inventory = JsonInventory::load(&path)?;

        write_hosts(io::stdout().lock(), &inventory.find_all(), self.output)?;
        Ok(())
    }
}

fn write_hosts<W: Write>(mut out: W, hosts: &[Host], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, hosts)?;
            writeln!(out)
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(out);
            wtr.write_record(["address", "name", "platform", "ports"])?;
            for host in hosts {
                let ports: Vec<String> = host.ports().iter().map(|p| p.to_string()).collect();
                wtr.write_record([
                    host.address(),
                    host.name(),
                    host.platform().unwrap_or(""),
                    &ports.join(";"),
                ])?;
            }
            wtr.flush()
        }
        OutputFormat::Plain => {
            if hosts.is_empty() {
                return writeln!(out, "{}", style("Inventory is empty.").dim());
            }
            writeln!(
                out,
                "{:<16}  {:<16}  {:<10}  {}",
                style("ADDRESS").bold(),
                style("NAME").bold(),
                style("PLATFORM").bold(),
                style("PORTS").bold()
            )?;
            for host in hosts {
                let ports: Vec<String> = host.ports().iter().map(|p| p.to_string()).collect();
                writeln!(
                    out,
                    "{:<16}  {:<16}  {:<10}  {}",
                    host.address(),
                    host.name(),
                    host.platform().unwrap_or("-"),
                    ports.join(",")
                )?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;

    fn hosts() -> Vec<Host> {
        vec![
            Host::new("10.0.0.5", [Port::SSH, Port::new(80).unwrap()])
                .with_name("web")
                .with_platform(Some("Linux".into())),
            Host::new("10.0.0.6", []),
        ]
    }

    #[test]
    fn test_csv_listing() {
        let mut buf = Vec::new();
        write_hosts(&mut buf, &hosts(), OutputFormat::Csv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "address,name,platform,ports");
        assert_eq!(lines[1], "10.0.0.5,web,Linux,22;80");
        assert_eq!(lines[2], "10.0.0.6,Unknown,,");
    }

    #[test]
    fn test_json_listing() {
        let mut buf = Vec::new();
        write_hosts(&mut buf, &hosts(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["ports"], serde_json::json!([22, 80]));
        assert!(value[1].get("platform").is_none());
    }
}
