//! Source address classification
//!
//! Parses the repository address once and exposes the transport scheme that
//! decides which authentication strategy is eligible.

use std::fmt;

use gitsource_common::Error;
use url::Url;

/// Port assumed for `ssh://` addresses without an explicit port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Transport scheme of a Git address
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    /// `ssh://`
    Ssh,
    /// `https://`
    Https,
    /// `http://`
    Http,
    /// Anything else (`git://`, `file://`, ...)
    Other(String),
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => write!(f, "ssh"),
            Self::Https => write!(f, "https"),
            Self::Http => write!(f, "http"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A parsed Git source address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceAddress {
    raw: String,
    url: Url,
    transport: Transport,
}

impl SourceAddress {
    /// Parse and classify a raw address
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::malformed_address(raw, "url is required"));
        }

        let url = Url::parse(trimmed).map_err(|e| Error::malformed_address(raw, e.to_string()))?;

        let transport = match url.scheme() {
            "ssh" => Transport::Ssh,
            "https" => Transport::Https,
            "http" => Transport::Http,
            other => Transport::Other(other.to_string()),
        };

        if matches!(transport, Transport::Ssh | Transport::Https | Transport::Http)
            && url.host_str().map_or(true, str::is_empty)
        {
            return Err(Error::malformed_address(raw, "address has no host"));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            url,
            transport,
        })
    }

    /// The address exactly as it will be written to the resource
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Transport scheme
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Whether the address uses the SSH transport
    pub fn is_ssh(&self) -> bool {
        self.transport == Transport::Ssh
    }

    /// Host name, if the address has one
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Explicit port or the scheme default
    pub fn port(&self) -> Option<u16> {
        match self.transport {
            Transport::Ssh => Some(self.url.port().unwrap_or(DEFAULT_SSH_PORT)),
            _ => self.url.port_or_known_default(),
        }
    }

    /// User name embedded in the address (e.g. `git` in `ssh://git@host/...`)
    pub fn username(&self) -> Option<&str> {
        Some(self.url.username()).filter(|u| !u.is_empty())
    }
}

impl fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
