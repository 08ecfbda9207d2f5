//! SSH host key discovery
//!
//! Collects the preferred public host key of a Git server so it can be pinned
//! in the credentials Secret as a `known_hosts` line.

use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use ssh2::Session;
use ssh_key::{HashAlg, PublicKey};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use gitsource_common::Error;

use crate::address::DEFAULT_SSH_PORT;

/// Default budget for a single host key probe
pub const DEFAULT_HOST_KEY_TIMEOUT: Duration = Duration::from_secs(30);

/// A collected host key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownHost {
    /// Host that was probed
    pub host: String,
    /// Port that was probed
    pub port: u16,
    /// Key algorithm name (e.g. `ssh-ed25519`)
    pub key_type: String,
    /// Base64-encoded public key blob
    pub key: String,
    /// SHA256 fingerprint of the key
    pub fingerprint: String,
}

impl KnownHost {
    /// Build from a raw SSH public key blob as sent during key exchange
    pub fn from_key_blob(host: &str, port: u16, blob: &[u8]) -> Result<Self, Error> {
        let parse_err = |e: ssh_key::Error| Error::host_key_discovery(host_label(host, port), e.to_string());
        let public = PublicKey::from_bytes(blob).map_err(parse_err)?;
        let encoded = public.to_openssh().map_err(parse_err)?;
        let mut parts = encoded.split_whitespace();
        let (key_type, key) = match (parts.next(), parts.next()) {
            (Some(key_type), Some(key)) => (key_type.to_string(), key.to_string()),
            _ => {
                return Err(Error::host_key_discovery(
                    host_label(host, port),
                    "server key could not be encoded",
                ))
            }
        };

        Ok(Self {
            host: host.to_string(),
            port,
            key_type,
            key,
            fingerprint: public.fingerprint(HashAlg::Sha256).to_string(),
        })
    }

    /// The `known_hosts` line pinning this key
    ///
    /// Non-default ports use the bracketed `[host]:port` form.
    pub fn known_hosts_line(&self) -> String {
        format!("{} {} {}", self.host_pattern(), self.key_type, self.key)
    }

    fn host_pattern(&self) -> String {
        if self.port == DEFAULT_SSH_PORT {
            self.host.clone()
        } else {
            format!("[{}]:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for KnownHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.known_hosts_line())
    }
}

fn host_label(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

/// Probe that collects a server's host key
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostKeyScanner: Send + Sync {
    /// Connect to `host:port` and return its preferred host key
    ///
    /// Fails with [`Error::Timeout`] when the budget elapses and with
    /// [`Error::HostKeyDiscoveryFailed`] when the server cannot be reached or
    /// the handshake fails.
    async fn scan(&self, host: &str, port: u16, timeout: Duration) -> Result<KnownHost, Error>;
}

/// Scanner performing a real SSH key exchange with libssh2
#[derive(Clone, Copy, Debug, Default)]
pub struct Ssh2HostKeyScanner;

impl Ssh2HostKeyScanner {
    fn scan_blocking(host: &str, port: u16, timeout: Duration) -> Result<KnownHost, Error> {
        let label = host_label(host, port);
        let failed = |msg: String| Error::host_key_discovery(label.clone(), msg);

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| failed(format!("failed to resolve host: {e}")))?
            .next()
            .ok_or_else(|| failed("host resolved to no addresses".to_string()))?;

        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| failed(format!("failed to connect: {e}")))?;

        let mut session = Session::new().map_err(|e| failed(format!("failed to create session: {e}")))?;
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| failed(format!("SSH handshake failed: {e}")))?;

        let (blob, _) = session
            .host_key()
            .ok_or_else(|| failed("server presented no host key".to_string()))?;
        KnownHost::from_key_blob(host, port, blob)
    }
}

#[async_trait]
impl HostKeyScanner for Ssh2HostKeyScanner {
    async fn scan(&self, host: &str, port: u16, timeout: Duration) -> Result<KnownHost, Error> {
        debug!(host = %host, port, ?timeout, "scanning SSH host key");
        let owned_host = host.to_string();
        let task =
            tokio::task::spawn_blocking(move || Self::scan_blocking(&owned_host, port, timeout));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(Error::internal_with_context(
                "host_key",
                format!("host key probe task failed: {join_err}"),
            )),
            Err(_) => Err(Error::timeout(
                format!("SSH host key from {}", host_label(host, port)),
                timeout,
            )),
        }
    }
}
