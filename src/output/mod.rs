//! Output formatting module.
//!
//! Renders a run report as plain text, JSON, or CSV.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::write_csv;
pub use json_format::write_json;
pub use plain::{print_info, print_run_header, write_plain};

use crate::cli::OutputFormat;
use crate::workflow::RunReport;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write a report in the requested format.
pub fn write_report<W: Write>(out: W, report: &RunReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => write_plain(out, report),
        OutputFormat::Json => write_json(out, report),
        OutputFormat::Csv => write_csv(out, report),
    }
}

/// Write a report to stdout, or to `path` when given.
pub fn emit_report(report: &RunReport, format: OutputFormat, path: Option<&Path>) -> io::Result<()> {
    match path {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path)?);
            write_report(&mut file, report, format)?;
            file.flush()
        }
        None => write_report(io::stdout().lock(), report, format),
    }
}
