//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::reconcile::HostMatch;
use crate::types::{Host, Port};
use crate::users::UserDiscoveryOutcome;
use crate::workflow::RunReport;
use console::{style, StyledObject};
use std::collections::BTreeSet;
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

fn port_list(ports: &BTreeSet<Port>) -> String {
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Write the report in human-readable form.
pub fn write_plain<W: Write>(mut out: W, report: &RunReport) -> io::Result<()> {
    let summary = report.delta.summary();

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                  {} Reconciliation",
        style("driftscan").cyan().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    writeln!(
        out,
        "  {} {}",
        style("Run ID:").bold(),
        style(report.id.short()).dim()
    )?;
    writeln!(
        out,
        "  {} {} addresses in {:.2}s",
        style("Scanned:").bold(),
        report.addresses_scanned,
        report.duration_ms() as f64 / 1000.0
    )?;
    writeln!(
        out,
        "  {} {} matched ({} drifted), {} new, {} missing",
        style("Summary:").bold(),
        summary.matched,
        style(summary.drifted).yellow().bold(),
        style(summary.new).green().bold(),
        style(summary.missing).red().bold()
    )?;
    writeln!(out)?;

    if report.delta.matches.is_empty()
        && report.delta.new_hosts.is_empty()
        && report.delta.missing_hosts.is_empty()
    {
        writeln!(out, "  {}", style("No hosts to display.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:<16}  {:<16}  {:<8}  {}",
            style("ADDRESS").bold(),
            style("NAME").bold(),
            style("STATUS").bold(),
            style("PORTS").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for entry in &report.delta.matches {
            write_match(&mut out, entry)?;
        }
        for host in &report.delta.new_hosts {
            write_host(&mut out, host, style("new").green().bold())?;
        }
        for host in &report.delta.missing_hosts {
            write_host(&mut out, host, style("missing").red().bold())?;
        }

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    if !report.scan_failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", style("Scan failures:").bold())?;
        for failure in &report.scan_failures {
            writeln!(
                out,
                "    {} {}",
                style(&failure.address).red(),
                failure.reason
            )?;
        }
    }

    if !report.users.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", style("Users:").bold())?;
        for outcome in &report.users {
            match outcome {
                UserDiscoveryOutcome::Found { address, users, .. } => {
                    writeln!(out, "    {:<16}  {}", address, users.join(", "))?;
                }
                UserDiscoveryOutcome::Failed { address, error } => {
                    writeln!(out, "    {:<16}  {}", address, style(error).red())?;
                }
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

fn write_match<W: Write>(out: &mut W, entry: &HostMatch) -> io::Result<()> {
    let status = if entry.has_drift() {
        style("drift").yellow().bold()
    } else {
        style("ok").dim()
    };
    writeln!(
        out,
        "  {:<16}  {:<16}  {:<8}  {}",
        entry.address,
        entry.name,
        status,
        port_list(&entry.ports)
    )?;
    if !entry.ports_added.is_empty() {
        writeln!(
            out,
            "  {:<16}  {:<16}  {:<8}  {}",
            "",
            "",
            style("+").green(),
            port_list(&entry.ports_added)
        )?;
    }
    if !entry.ports_removed.is_empty() {
        writeln!(
            out,
            "  {:<16}  {:<16}  {:<8}  {}",
            "",
            "",
            style("-").red(),
            port_list(&entry.ports_removed)
        )?;
    }
    Ok(())
}

fn write_host<W: Write>(out: &mut W, host: &Host, status: StyledObject<&str>) -> io::Result<()> {
    writeln!(
        out,
        "  {:<16}  {:<16}  {:<8}  {}",
        host.address(),
        host.name(),
        status,
        port_list(host.ports())
    )
}

/// Print a short banner before scanning begins.
pub fn print_run_header(targets: &str, addresses: usize, ports: usize) {
    eprintln!();
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("driftscan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!(
        "{} Targets: {} ({} addresses)",
        style("•").dim(),
        style(targets).white().bold(),
        addresses
    );
    eprintln!(
        "{} Probing {} ports per live host...",
        style("•").dim(),
        style(ports).white().bold()
    );
    eprintln!();
}

/// Print an info message.
pub fn print_info(msg: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}
