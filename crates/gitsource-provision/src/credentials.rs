//! Credential provisioning
//!
//! Decides which authentication strategy applies to a source and produces the
//! matching material. Precedence, first match wins:
//!
//! 1. an explicit secret reference, used verbatim
//! 2. an `ssh://` address: generated deploy key plus the server's host key
//! 3. username and password: basic auth
//! 4. nothing

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::OsRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use gitsource_common::{
    Error, SECRET_KEY_IDENTITY, SECRET_KEY_IDENTITY_PUB, SECRET_KEY_KNOWN_HOSTS,
    SECRET_KEY_PASSWORD, SECRET_KEY_USERNAME,
};

use crate::address::SourceAddress;
use crate::confirm::Confirm;
use crate::host_key::{HostKeyScanner, DEFAULT_HOST_KEY_TIMEOUT};
use crate::keygen::{generate_key_pair, KeyAlgorithm};
use crate::progress::{Phase, ProgressReporter};

/// Prompt shown after the deploy key is printed
pub const DEPLOY_KEY_PROMPT: &str = "Have you added the deploy key to your repository";

/// Settings for credential provisioning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProvisionConfig {
    /// Algorithm for generated deploy keys
    pub key_algorithm: KeyAlgorithm,
    /// Budget for the SSH host key probe
    pub host_key_timeout: Duration,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            key_algorithm: KeyAlgorithm::default(),
            host_key_timeout: DEFAULT_HOST_KEY_TIMEOUT,
        }
    }
}

/// Authentication inputs supplied by the caller
#[derive(Clone, Default)]
pub struct AuthInputs {
    /// Name of a pre-existing Secret to reference
    pub secret_ref: Option<String>,
    /// Basic-auth username
    pub username: Option<String>,
    /// Basic-auth password
    pub password: Option<Zeroizing<String>>,
}

impl AuthInputs {
    fn explicit_ref(&self) -> Option<&str> {
        self.secret_ref.as_deref().filter(|s| !s.is_empty())
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|s| !s.is_empty())
    }

    fn password(&self) -> Option<&str> {
        self.password
            .as_ref()
            .map(|p| p.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for AuthInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInputs")
            .field("secret_ref", &self.secret_ref)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Authentication material for one run
pub enum CredentialBundle {
    /// Generated deploy key with the pinned server host key
    SshKeyPair {
        /// OpenSSH private key
        private_key: Zeroizing<String>,
        /// `authorized_keys` line
        public_key: String,
        /// `known_hosts` line for the server
        known_hosts: String,
    },
    /// Username and password
    BasicAuth {
        /// Username
        username: String,
        /// Password
        password: Zeroizing<String>,
    },
    /// A Secret managed elsewhere
    ExternalRef {
        /// Secret name
        name: String,
    },
}

impl CredentialBundle {
    /// Whether this bundle needs a Secret published by this run
    pub fn is_managed(&self) -> bool {
        !matches!(self, Self::ExternalRef { .. })
    }

    /// Name of the Secret the source should reference
    ///
    /// Managed bundles are stored under the source's own name.
    pub fn secret_name(&self, source_name: &str) -> String {
        match self {
            Self::ExternalRef { name } => name.clone(),
            _ => source_name.to_string(),
        }
    }

    /// The key/value pairs to publish; empty for an external reference
    pub fn secret_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        match self {
            Self::SshKeyPair {
                private_key,
                public_key,
                known_hosts,
            } => {
                fields.insert(SECRET_KEY_IDENTITY.to_string(), private_key.to_string());
                fields.insert(SECRET_KEY_IDENTITY_PUB.to_string(), public_key.clone());
                fields.insert(SECRET_KEY_KNOWN_HOSTS.to_string(), known_hosts.clone());
            }
            Self::BasicAuth { username, password } => {
                fields.insert(SECRET_KEY_USERNAME.to_string(), username.clone());
                fields.insert(SECRET_KEY_PASSWORD.to_string(), password.to_string());
            }
            Self::ExternalRef { .. } => {}
        }
        fields
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SshKeyPair {
                public_key,
                known_hosts,
                ..
            } => f
                .debug_struct("SshKeyPair")
                .field("private_key", &"<redacted>")
                .field("public_key", public_key)
                .field("known_hosts", known_hosts)
                .finish(),
            Self::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::ExternalRef { name } => f.debug_struct("ExternalRef").field("name", name).finish(),
        }
    }
}

/// Produces the credential bundle for a source
pub struct CredentialProvisioner {
    config: ProvisionConfig,
    scanner: Arc<dyn HostKeyScanner>,
    confirm: Arc<dyn Confirm>,
    progress: Arc<dyn ProgressReporter>,
}

impl CredentialProvisioner {
    /// Create a provisioner
    pub fn new(
        config: ProvisionConfig,
        scanner: Arc<dyn HostKeyScanner>,
        confirm: Arc<dyn Confirm>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            config,
            scanner,
            confirm,
            progress,
        }
    }

    /// Select a strategy and produce its material
    ///
    /// Returns `Ok(None)` when no authentication applies.
    pub async fn provision(
        &self,
        address: &SourceAddress,
        auth: &AuthInputs,
        cancel: &CancellationToken,
    ) -> Result<Option<CredentialBundle>, Error> {
        if let Some(name) = auth.explicit_ref() {
            debug!(secret = %name, "using existing secret reference");
            return Ok(Some(CredentialBundle::ExternalRef {
                name: name.to_string(),
            }));
        }

        if address.is_ssh() {
            return self.provision_ssh(address, cancel).await.map(Some);
        }

        match (auth.username(), auth.password()) {
            (Some(username), Some(password)) => Ok(Some(CredentialBundle::BasicAuth {
                username: username.to_string(),
                password: Zeroizing::new(password.to_string()),
            })),
            (Some(_), None) | (None, Some(_)) => {
                warn!(
                    url = %address,
                    "both username and password are required for basic auth, continuing without credentials"
                );
                Ok(None)
            }
            (None, None) => Ok(None),
        }
    }

    async fn provision_ssh(
        &self,
        address: &SourceAddress,
        cancel: &CancellationToken,
    ) -> Result<CredentialBundle, Error> {
        let (host, port) = match (address.host(), address.port()) {
            (Some(host), Some(port)) => (host.to_string(), port),
            _ => return Err(Error::malformed_address(address.as_str(), "address has no host")),
        };

        debug!(
            user = address.username().unwrap_or_default(),
            host = %host,
            port,
            "provisioning SSH credentials"
        );

        self.progress.report(Phase::Generate, "generating deploy key pair");
        let algorithm = self.config.key_algorithm;
        let generate =
            tokio::task::spawn_blocking(move || generate_key_pair(&mut OsRng, algorithm));
        let key_pair = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::canceled("key generation canceled"));
            }
            joined = generate => joined.map_err(|e| {
                Error::internal_with_context("keygen", format!("key generation task failed: {e}"))
            })??,
        };
        info!(
            algorithm = %self.config.key_algorithm,
            fingerprint = %key_pair.fingerprint,
            "generated deploy key pair"
        );
        self.progress
            .report(Phase::Success, &format!("deploy key: {}", key_pair.public_key));

        self.await_confirmation(cancel).await?;

        self.progress
            .report(Phase::Action, "collecting preferred public key from SSH server");
        let known_host = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::canceled("host key discovery canceled"));
            }
            result = self.scanner.scan(&host, port, self.config.host_key_timeout) => result?,
        };
        self.progress.report(
            Phase::Success,
            &format!("collected public key from SSH server:\n{known_host}"),
        );

        Ok(CredentialBundle::SshKeyPair {
            private_key: key_pair.private_key,
            public_key: key_pair.public_key,
            known_hosts: known_host.known_hosts_line(),
        })
    }

    async fn await_confirmation(&self, cancel: &CancellationToken) -> Result<(), Error> {
        let confirm = Arc::clone(&self.confirm);
        let prompt = tokio::task::spawn_blocking(move || confirm.confirm(DEPLOY_KEY_PROMPT));

        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::canceled("confirmation canceled"));
            }
            joined = prompt => joined.map_err(|e| {
                Error::internal_with_context("confirm", format!("confirmation task failed: {e}"))
            })??,
        };

        if answer {
            Ok(())
        } else {
            Err(Error::canceled("deploy key was not confirmed"))
        }
    }
}
