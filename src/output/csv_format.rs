//! CSV output formatting.
//!
//! One row per host in the delta, then one per abandoned host scan and one
//! per user-discovery outcome. Port and user lists are separated by `;`.

use crate::types::Port;
use crate::users::UserDiscoveryOutcome;
use crate::workflow::RunReport;
use std::collections::BTreeSet;
use std::io::{self, Write};

fn join(ports: &BTreeSet<Port>) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Write the run report in CSV format.
pub fn write_csv<W: Write>(out: W, report: &RunReport) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let empty = BTreeSet::new();

    wtr.write_record([
        "address", "name", "status", "ports", "added", "removed", "detail",
    ])?;

    for entry in &report.delta.matches {
        let status = if entry.has_drift() { "drift" } else { "match" };
        wtr.write_record([
            entry.address.as_str(),
            entry.name.as_str(),
            status,
            &join(&entry.ports),
            &join(&entry.ports_added),
            &join(&entry.ports_removed),
            "",
        ])?;
    }

    for host in &report.delta.new_hosts {
        wtr.write_record([
            host.address(),
            host.name(),
            "new",
            &join(host.ports()),
            &join(host.ports()),
            &join(&empty),
            "",
        ])?;
    }

    for host in &report.delta.missing_hosts {
        wtr.write_record([
            host.address(),
            host.name(),
            "missing",
            &join(&empty),
            &join(&empty),
            &join(host.ports()),
            "",
        ])?;
    }

    for failure in &report.scan_failures {
        wtr.write_record([
            failure.address.as_str(),
            "",
            "failed",
            "",
            "",
            "",
            failure.reason.as_str(),
        ])?;
    }

    for outcome in &report.users {
        let (status, detail) = match outcome {
            UserDiscoveryOutcome::Found { users, .. } => ("users", users.join(";")),
            UserDiscoveryOutcome::Failed { error, .. } => ("users-failed", error.clone()),
        };
        wtr.write_record([outcome.address(), "", status, "", "", "", detail.as_str()])?;
    }

    wtr.flush()?;
    Ok(())
}
