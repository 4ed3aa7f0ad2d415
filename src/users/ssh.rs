//! SSH user discovery for Linux hosts.
//!
//! The strategy resolves credentials first, then opens a session, lists
//! `/etc/passwd` login names and closes the session on every path. The
//! transport sits behind [`SshConnector`]; [`Ssh2Connector`] is the
//! libssh2-backed implementation.

use super::UserDiscovery;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::storage::{Capability, CredentialRecord, CredentialResolver};
use crate::types::{Host, Port};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Generic SSH access.
pub const SSH: Capability = Capability::new("Ssh", &["Ssh"]);

/// SSH access to a Linux host. Falls back to plain [`SSH`] credentials.
pub const SSH_LINUX: Capability = Capability::new("SshLinux", &["SshLinux", "Ssh"]);

/// Remote command printing one login name per line.
pub const LIST_USERS_COMMAND: &str = "cut -d: -f1 /etc/passwd";

/// Platform tag the Linux strategy accepts.
pub const LINUX_PLATFORM: &str = "Linux";

/// Opens authenticated SSH sessions.
#[async_trait]
pub trait SshConnector: Send + Sync {
    async fn connect(
        &self,
        address: &str,
        port: Port,
        credentials: &CredentialRecord,
    ) -> DiscoveryResult<Box<dyn SshSession>>;
}

/// An authenticated session.
#[async_trait]
pub trait SshSession: Send {
    /// Run a command and return its standard output.
    async fn exec(&mut self, command: &str) -> DiscoveryResult<String>;

    /// Tear the session down. Safe to call more than once.
    async fn close(&mut self);
}

/// Lists users over SSH on hosts tagged `Linux` with port 22 open.
pub struct SshLinuxUserDiscovery {
    credentials: Arc<dyn CredentialResolver>,
    connector: Arc<dyn SshConnector>,
}

impl SshLinuxUserDiscovery {
    pub fn new(credentials: Arc<dyn CredentialResolver>, connector: Arc<dyn SshConnector>) -> Self {
        Self {
            credentials,
            connector,
        }
    }
}

#[async_trait]
impl UserDiscovery for SshLinuxUserDiscovery {
    fn capability(&self) -> Capability {
        SSH_LINUX
    }

    fn supports(&self, host: &Host) -> bool {
        host.platform() == Some(LINUX_PLATFORM) && host.ssh_port().is_some()
    }

    async fn discover_users(&self, host: &Host) -> DiscoveryResult<Vec<String>> {
        let port = host
            .ssh_port()
            .ok_or_else(|| DiscoveryError::NoStrategyAvailable(host.address().to_string()))?;
        let credentials = self.credentials.resolve(&SSH_LINUX, host.address())?;

        let mut session = self
            .connector
            .connect(host.address(), port, &credentials)
            .await?;
        let output = session.exec(LIST_USERS_COMMAND).await;
        session.close().await;

        Ok(output?.split('\n').map(str::to_string).collect())
    }
}

/// Parameters understood by [`Ssh2Connector`].
///
/// Authenticates with a key file when one is given, else with the
/// password, else through a running SSH agent.
#[derive(Debug, Deserialize)]
struct SshParams {
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    key_filename: Option<PathBuf>,
    #[serde(default)]
    passphrase: Option<String>,
}

/// libssh2-backed connector. Blocking calls run on the blocking pool.
#[derive(Debug, Clone)]
pub struct Ssh2Connector {
    timeout: Duration,
}

impl Ssh2Connector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SshConnector for Ssh2Connector {
    async fn connect(
        &self,
        address: &str,
        port: Port,
        credentials: &CredentialRecord,
    ) -> DiscoveryResult<Box<dyn SshSession>> {
        let params: SshParams =
            credentials
                .decode()
                .map_err(|e| DiscoveryError::InvalidCredentials {
                    address: address.to_string(),
                    reason: e.to_string(),
                })?;

        let owned_address = address.to_string();
        let timeout = self.timeout;
        let session = tokio::task::spawn_blocking(move || {
            open_session(&owned_address, port, &params, timeout)
        })
        .await
        .map_err(|e| transport(address, e))??;

        debug!(address, %port, "ssh session established");
        Ok(Box::new(Ssh2Session {
            address: address.to_string(),
            session: Some(session),
        }))
    }
}

fn open_session(
    address: &str,
    port: Port,
    params: &SshParams,
    timeout: Duration,
) -> DiscoveryResult<ssh2::Session> {
    let socket = (address, port.as_u16())
        .to_socket_addrs()
        .map_err(|e| transport(address, e))?
        .next()
        .ok_or_else(|| transport(address, "address did not resolve"))?;

    let tcp = TcpStream::connect_timeout(&socket, timeout).map_err(|e| transport(address, e))?;

    let mut session = ssh2::Session::new().map_err(|e| transport(address, e))?;
    session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| transport(address, e))?;

    let auth = match (&params.key_filename, &params.password) {
        (Some(key), _) => session.userauth_pubkey_file(
            &params.username,
            None,
            key,
            params.passphrase.as_deref(),
        ),
        (None, Some(password)) => session.userauth_password(&params.username, password),
        (None, None) => session.userauth_agent(&params.username),
    };
    auth.map_err(|e| DiscoveryError::Authentication {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    if !session.authenticated() {
        return Err(DiscoveryError::Authentication {
            address: address.to_string(),
            reason: "server rejected credentials".to_string(),
        });
    }

    Ok(session)
}

fn transport(address: &str, reason: impl ToString) -> DiscoveryError {
    DiscoveryError::Transport {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

struct Ssh2Session {
    address: String,
    session: Option<ssh2::Session>,
}

fn run_command(session: &ssh2::Session, command: &str) -> Result<String, String> {
    let mut channel = session.channel_session().map_err(|e| e.to_string())?;
    channel.exec(command).map_err(|e| e.to_string())?;

    let mut output = String::new();
    channel
        .read_to_string(&mut output)
        .map_err(|e| e.to_string())?;
    channel.wait_close().map_err(|e| e.to_string())?;
    Ok(output)
}

#[async_trait]
impl SshSession for Ssh2Session {
    async fn exec(&mut self, command: &str) -> DiscoveryResult<String> {
        let session = self
            .session
            .take()
            .ok_or_else(|| transport(&self.address, "session already closed"))?;

        let command = command.to_string();
        let (session, result) = tokio::task::spawn_blocking(move || {
            let result = run_command(&session, &command);
            (session, result)
        })
        .await
        .map_err(|e| transport(&self.address, e))?;

        self.session = Some(session);
        result.map_err(|e| transport(&self.address, e))
    }

    async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let address = self.address.clone();
        let closed = tokio::task::spawn_blocking(move || {
            session.disconnect(None, "user discovery finished", None)
        })
        .await;

        match closed {
            Ok(Ok(())) => debug!(%address, "ssh session closed"),
            Ok(Err(e)) => debug!(%address, error = %e, "ssh disconnect failed"),
            Err(e) => debug!(%address, error = %e, "ssh disconnect task failed"),
        }
    }
}
