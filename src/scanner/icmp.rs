//! ICMP echo liveness probe.
//!
//! A single echo request per host. No reply inside the timeout means the
//! host is treated as absent and none of its ports are probed.

use crate::error::{ScanError, ScanResult};
use crate::scanner::traits::LivenessProbe;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use surge_ping::{Client, Config, PingIdentifier, PingSequence, ICMP};
use tracing::{debug, warn};

const PAYLOAD: [u8; 56] = [0u8; 56];

/// ICMP echo probe backed by `surge-ping`.
///
/// Opening ICMP sockets may need elevated privileges (or a permissive
/// `net.ipv4.ping_group_range` on Linux).
pub struct IcmpLivenessProbe {
    v4: Client,
    v6: Option<Client>,
}

impl IcmpLivenessProbe {
    /// Open the ICMP sockets. Must be called inside a tokio runtime.
    ///
    /// Fails if no IPv4 socket can be opened; a missing IPv6 socket only
    /// makes IPv6 hosts look absent.
    pub fn new() -> ScanResult<Self> {
        let v4 = Client::new(&Config::default())
            .map_err(|e| ScanError::LivenessUnavailable(e.to_string()))?;

        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "ICMPv6 socket unavailable, IPv6 hosts will be reported absent");
                None
            }
        };

        Ok(Self { v4, v6 })
    }

    fn client_for(&self, address: IpAddr) -> Option<&Client> {
        match address {
            IpAddr::V4(_) => Some(&self.v4),
            IpAddr::V6(_) => self.v6.as_ref(),
        }
    }
}

#[async_trait]
impl LivenessProbe for IcmpLivenessProbe {
    async fn is_alive(&self, address: IpAddr, timeout: Duration) -> bool {
        let Some(client) = self.client_for(address) else {
            return false;
        };

        let mut pinger = client.pinger(address, PingIdentifier(rand::random())).await;
        pinger.timeout(timeout);

        match pinger.ping(PingSequence(0), &PAYLOAD).await {
            Ok((_, rtt)) => {
                debug!(%address, ?rtt, "got ping response");
                true
            }
            Err(e) => {
                debug!(%address, error = %e, "no ping response");
                false
            }
        }
    }
}
