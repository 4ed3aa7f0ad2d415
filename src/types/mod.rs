//! Core type definitions: ports, targets, host records and run identifiers.
//!
//! Newtypes keep invalid ports and malformed targets out of the scanner.

mod host;
mod port;
mod run_id;
mod target;

pub use host::{Host, UNKNOWN_NAME};
pub use port::{flatten, Port, PortError, PortRange, PortSpec};
pub use run_id::RunId;
pub use target::{resolve_all, TargetError, TargetSpec};
