//! Scanner module - liveness gating and concurrent port probing.
//!
//! The [`ScanCoordinator`] runs the liveness probe for each address and,
//! for hosts that answer, probes every requested port. Hosts are scanned
//! independently; one host's failure never stops the others.

pub mod icmp;
pub mod rate_limiter;
pub mod tcp;
pub mod traits;

use crate::error::{ScanError, ScanResult};
use crate::types::{flatten, Host, Port, PortRange};
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub use icmp::IcmpLivenessProbe;
pub use rate_limiter::RateLimiter;
pub use tcp::TcpConnectProbe;
pub use traits::{AssumeAlive, LivenessMode, LivenessProbe, PortProbe};

/// Per-probe timeout used when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// What to scan. Not persisted.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub addresses: Vec<IpAddr>,
    pub port_ranges: Vec<PortRange>,
    pub timeout: Duration,
}

impl ScanRequest {
    pub fn new(addresses: Vec<IpAddr>, port_ranges: Vec<PortRange>) -> Self {
        Self {
            addresses,
            port_ranges,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Concurrency and pacing limits for a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Hosts scanned at the same time.
    pub host_concurrency: usize,
    /// Port probes in flight across all hosts.
    pub port_concurrency: usize,
    /// Probes per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Draw a progress bar on stderr.
    pub show_progress: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            host_concurrency: 64,
            port_concurrency: 500,
            rate_limit: 0,
            show_progress: false,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_host_concurrency(mut self, concurrency: usize) -> Self {
        self.host_concurrency = concurrency.max(1);
        self
    }

    pub fn with_port_concurrency(mut self, concurrency: usize) -> Self {
        self.port_concurrency = concurrency.max(1);
        self
    }

    pub fn with_rate_limit(mut self, rate: u32) -> Self {
        self.rate_limit = rate;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }
}

/// A host whose scan was abandoned after an unrecoverable probe error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostScanFailure {
    pub address: String,
    pub reason: String,
}

/// Everything a scan produced: reachable hosts and per-host failures.
///
/// Absent hosts appear in neither list.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub hosts: Vec<Host>,
    pub failures: Vec<HostScanFailure>,
}

enum HostOutcome {
    Absent,
    Found(Host),
    Failed(HostScanFailure),
}

/// Drives liveness and port probes across the host x port cross-product.
pub struct ScanCoordinator {
    liveness: Arc<dyn LivenessProbe>,
    probe: Arc<dyn PortProbe>,
    config: CoordinatorConfig,
}

impl ScanCoordinator {
    pub fn new(
        liveness: Arc<dyn LivenessProbe>,
        probe: Arc<dyn PortProbe>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            liveness,
            probe,
            config,
        }
    }

    /// Build a coordinator with the TCP connect probe and the chosen
    /// liveness check. Must be called inside a tokio runtime.
    pub fn with_mode(mode: LivenessMode, config: CoordinatorConfig) -> ScanResult<Self> {
        let liveness: Arc<dyn LivenessProbe> = match mode {
            LivenessMode::Icmp => Arc::new(IcmpLivenessProbe::new()?),
            LivenessMode::Skip => Arc::new(AssumeAlive),
        };
        Ok(Self::new(liveness, Arc::new(TcpConnectProbe::new()), config))
    }

    /// Scan every requested address.
    ///
    /// Result order is unspecified. A host that fails its liveness check is
    /// left out entirely; a live host with no open ports is still reported.
    pub async fn scan(&self, request: &ScanRequest) -> ScanOutcome {
        let ports = flatten(&request.port_ranges);
        let semaphore = Semaphore::new(self.config.port_concurrency.max(1));
        let limiter = RateLimiter::new(self.config.rate_limit);
        let progress = self.progress_bar(request.addresses.len());

        debug!(
            hosts = request.addresses.len(),
            ports = ports.len(),
            timeout = ?request.timeout,
            "started host scanning"
        );

        let outcomes: Vec<HostOutcome> = stream::iter(request.addresses.iter().copied())
            .map(|address| {
                let ports = &ports;
                let semaphore = &semaphore;
                let limiter = limiter.as_ref();
                let progress = &progress;

                async move {
                    let outcome = self
                        .scan_host(address, ports, request.timeout, semaphore, limiter)
                        .await;
                    progress.inc(1);
                    outcome
                }
            })
            .buffer_unordered(self.config.host_concurrency.max(1))
            .collect()
            .await;

        progress.finish_and_clear();

        let mut result = ScanOutcome::default();
        for outcome in outcomes {
            match outcome {
                HostOutcome::Absent => {}
                HostOutcome::Found(host) => result.hosts.push(host),
                HostOutcome::Failed(failure) => result.failures.push(failure),
            }
        }

        info!(
            found = result.hosts.len(),
            failed = result.failures.len(),
            "port scanning is finished"
        );
        result
    }

    async fn scan_host(
        &self,
        address: IpAddr,
        ports: &[Port],
        timeout: Duration,
        semaphore: &Semaphore,
        limiter: Option<&RateLimiter>,
    ) -> HostOutcome {
        if !self.liveness.is_alive(address, timeout).await {
            debug!(%address, "host is unavailable");
            return HostOutcome::Absent;
        }

        let open: ScanResult<Vec<Option<Port>>> = stream::iter(ports.iter().copied())
            .map(|port| async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| ScanError::Unrecoverable {
                        target: address.to_string(),
                        port: port.as_u16(),
                        reason: e.to_string(),
                    })?;
                if let Some(limiter) = limiter {
                    limiter.wait().await;
                }
                let is_open = self.probe.probe(address, port, timeout).await?;
                Ok::<_, ScanError>(is_open.then_some(port))
            })
            .buffer_unordered(self.config.port_concurrency.max(1))
            .try_collect()
            .await;

        match open {
            Ok(open) => {
                let host = Host::new(address.to_string(), open.into_iter().flatten());
                debug!(%address, open = host.ports().len(), "host scanned");
                HostOutcome::Found(host)
            }
            Err(e) => {
                warn!(%address, error = %e, "host scan aborted");
                HostOutcome::Failed(HostScanFailure {
                    address: address.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} hosts",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar
    }
}
