//! Error types for gitsource
//!
//! Errors are structured with fields to aid debugging. Every failure kind of
//! the provisioning workflow has its own variant so callers can match on the
//! kind without parsing messages.

use std::time::Duration;

use thiserror::Error;

/// Main error type for gitsource operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error, propagated unmodified
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The source address could not be parsed into a URL
    #[error("malformed git address {address:?}: {message}")]
    MalformedAddress {
        /// The raw address as supplied
        address: String,
        /// Why parsing failed
        message: String,
    },

    /// Conflicting or missing revision selector, authentication or flag input
    #[error("invalid selection{}: {message}", field.as_ref().map(|f| format!(" for {f}")).unwrap_or_default())]
    InvalidSelection {
        /// Description of what's invalid
        message: String,
        /// The offending input (e.g., "--git-implementation")
        field: Option<String>,
    },

    /// Local keypair generation failed
    #[error("key generation failed [{algorithm}]: {message}")]
    KeyGenerationFailed {
        /// Algorithm that was requested (e.g., "rsa-2048", "ed25519")
        algorithm: String,
        /// Description of what failed
        message: String,
    },

    /// The remote SSH host key could not be collected
    #[error("host key discovery failed for {host}: {message}")]
    HostKeyDiscoveryFailed {
        /// Host (and port) that was probed
        host: String,
        /// Description of what failed
        message: String,
    },

    /// Optimistic-concurrency collision on write
    #[error("conflict writing {kind} {namespace}/{name}: {message}")]
    Conflict {
        /// Resource kind (Secret, GitRepository)
        kind: String,
        /// Resource namespace
        namespace: String,
        /// Resource name
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// A deadline elapsed while the operation was still pending
    #[error("timed out after {timeout:?} waiting for {operation}")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// The budget that was exceeded
        timeout: Duration,
    },

    /// The reconciliation controller reported a terminal failure
    #[error("{kind} {namespace}/{name} reconciliation failed: {message}")]
    ReconciliationFailed {
        /// Resource kind
        kind: String,
        /// Resource namespace
        namespace: String,
        /// Resource name
        name: String,
        /// Message from the Ready condition, verbatim
        message: String,
    },

    /// The resource is Ready but carries no artifact
    #[error("{kind} {namespace}/{name} reconciliation completed but no artifact was found")]
    ArtifactMissing {
        /// Resource kind
        kind: String,
        /// Resource namespace
        namespace: String,
        /// Resource name
        name: String,
    },

    /// The run was aborted by the user or by the caller's cancellation signal
    #[error("canceled: {reason}")]
    Canceled {
        /// Why the run stopped
        reason: String,
    },

    /// A resource expected to exist was not found
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Resource kind
        kind: String,
        /// Resource namespace
        namespace: String,
        /// Resource name
        name: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "host_key", "poller")
        context: String,
    },
}

impl Error {
    /// Create a malformed address error
    pub fn malformed_address(address: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedAddress {
            address: address.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid selection error without field context
    pub fn invalid_selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection {
            message: msg.into(),
            field: None,
        }
    }

    /// Create an invalid selection error for a specific input
    pub fn invalid_selection_for(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidSelection {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a key generation error
    pub fn key_generation(algorithm: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::KeyGenerationFailed {
            algorithm: algorithm.into(),
            message: msg.into(),
        }
    }

    /// Create a host key discovery error
    pub fn host_key_discovery(host: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::HostKeyDiscoveryFailed {
            host: host.into(),
            message: msg.into(),
        }
    }

    /// Create a conflict error for a resource
    pub fn conflict(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Create a cancellation error
    pub fn canceled(reason: impl Into<String>) -> Self {
        Self::Canceled {
            reason: reason.into(),
        }
    }

    /// Create a not-found error for a resource
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if a higher layer may retry the whole run after this error
    ///
    /// Nothing is retried inside the workflow itself. Conflicts and timeouts
    /// are worth another attempt; input and controller-reported failures are
    /// not until something changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
            ),
            Error::Conflict { .. } => true,
            Error::Timeout { .. } => true,
            Error::HostKeyDiscoveryFailed { .. } => true,
            Error::Internal { .. } => true,
            Error::MalformedAddress { .. }
            | Error::InvalidSelection { .. }
            | Error::KeyGenerationFailed { .. }
            | Error::ReconciliationFailed { .. }
            | Error::ArtifactMissing { .. }
            | Error::Canceled { .. }
            | Error::NotFound { .. } => false,
        }
    }
}

/// Returns true when a kube error is an HTTP 404 from the API server
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Returns true when a kube error is an HTTP 409 (AlreadyExists or Conflict)
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}
