//! TCP connect port probe.
//!
//! Completes a full handshake with the operating system's socket API and
//! closes the connection immediately. No data is exchanged.

use crate::error::{ScanError, ScanResult};
use crate::scanner::traits::PortProbe;
use crate::types::Port;
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// TCP connect probe. Does not require elevated privileges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnectProbe;

impl TcpConnectProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PortProbe for TcpConnectProbe {
    async fn probe(&self, address: IpAddr, port: Port, limit: Duration) -> ScanResult<bool> {
        let addr = SocketAddr::new(address, port.as_u16());
        connect_within(address, port, limit, TcpStream::connect(addr)).await
    }
}

/// Drive a connect attempt under `limit`. The connection, if any, is dropped
/// as soon as it is established.
async fn connect_within<F, S>(address: IpAddr, port: Port, limit: Duration, connect: F) -> ScanResult<bool>
where
    F: Future<Output = io::Result<S>>,
{
    match timeout(limit, connect).await {
        Ok(Ok(stream)) => {
            drop(stream);
            debug!(%address, %port, "port is open");
            Ok(true)
        }
        Ok(Err(e)) if is_negative_outcome(&e) => {
            debug!(%address, %port, error = %e, "port is closed");
            Ok(false)
        }
        Ok(Err(e)) => Err(ScanError::Unrecoverable {
            target: address.to_string(),
            port: port.as_u16(),
            reason: e.to_string(),
        }),
        Err(_) => {
            debug!(%address, %port, "connect timed out");
            Ok(false)
        }
    }
}

/// Connect-phase failures that just mean "nobody is listening here".
fn is_negative_outcome(e: &io::Error) -> bool {
    if matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
    ) {
        return true;
    }

    is_unreachable(e)
}

#[cfg(unix)]
fn is_unreachable(e: &io::Error) -> bool {
    e.raw_os_error()
        .is_some_and(|code| [libc::EHOSTUNREACH, libc::ENETUNREACH, libc::EHOSTDOWN].contains(&code))
}

// No portable errno constants here; fall back to the OS message.
#[cfg(not(unix))]
fn is_unreachable(e: &io::Error) -> bool {
    e.to_string().to_lowercase().contains("unreachable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn test_open_port() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();

        let open = TcpConnectProbe::new()
            .probe(LOCALHOST, port, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(open);
    }

    #[tokio::test]
    async fn test_closed_port_is_not_an_error() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
        drop(listener);

        let result = TcpConnectProbe::new()
            .probe(LOCALHOST, port, Duration::from_millis(500))
            .await;
        assert!(matches!(result, Ok(false)));
    }

    #[tokio::test]
    async fn test_connect_timeout_is_closed() {
        let port = Port::new(9).unwrap();
        let stalled = std::future::pending::<io::Result<()>>();

        let result = connect_within(LOCALHOST, port, Duration::from_millis(10), stalled).await;
        assert!(matches!(result, Ok(false)));
    }

    #[tokio::test]
    async fn test_unexpected_connect_error_is_unrecoverable() {
        let port = Port::new(9).unwrap();
        let failing = async { Err::<(), _>(io::Error::from(io::ErrorKind::PermissionDenied)) };

        let result = connect_within(LOCALHOST, port, Duration::from_secs(1), failing).await;
        assert!(matches!(result, Err(ScanError::Unrecoverable { port: 9, .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreachable_errno_is_closed() {
        assert!(is_negative_outcome(&io::Error::from_raw_os_error(libc::EHOSTUNREACH)));
        assert!(is_negative_outcome(&io::Error::from_raw_os_error(libc::ENETUNREACH)));
        assert!(!is_negative_outcome(&io::Error::from_raw_os_error(libc::EACCES)));
    }

    #[test]
    fn test_negative_outcome_classification() {
        assert!(is_negative_outcome(&io::Error::from(
            io::ErrorKind::ConnectionRefused
        )));
        assert!(is_negative_outcome(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_negative_outcome(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
        assert!(!is_negative_outcome(&io::Error::from(
            io::ErrorKind::AddrNotAvailable
        )));
    }
}
