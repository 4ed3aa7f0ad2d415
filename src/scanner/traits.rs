//! Probe trait abstractions.
//!
//! The coordinator only talks to these traits, so the real TCP/ICMP probes
//! can be swapped for scripted ones in tests.

use crate::error::ScanResult;
use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Tests whether a single TCP port accepts connections.
///
/// `Ok(false)` covers every expected negative answer (refused, timed out,
/// unreachable). `Err` is reserved for failures that make the rest of the
/// host's scan meaningless.
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn probe(&self, address: IpAddr, port: Port, timeout: Duration) -> ScanResult<bool>;
}

/// Decides whether a host is reachable at all.
///
/// Silence within the timeout means "absent"; it is never an error.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_alive(&self, address: IpAddr, timeout: Duration) -> bool;
}

/// Liveness probe that treats every host as reachable.
///
/// For networks that drop ICMP echo; every address gets a full port scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeAlive;

#[async_trait]
impl LivenessProbe for AssumeAlive {
    async fn is_alive(&self, _address: IpAddr, _timeout: Duration) -> bool {
        true
    }
}

/// How hosts are checked before their ports are probed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum LivenessMode {
    /// ICMP echo request.
    #[default]
    Icmp,
    /// Skip the check and scan every address.
    Skip,
}

impl fmt::Display for LivenessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Icmp => write!(f, "icmp"),
            Self::Skip => write!(f, "skip"),
        }
    }
}
