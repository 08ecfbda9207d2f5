//! Credential provisioning and reconciliation confirmation for Flux Git sources
//!
//! The pieces compose into [`SourceGitWorkflow`]:
//!
//! - [`address`]: classifies the repository address
//! - [`credentials`]: picks an authentication strategy and produces material
//! - [`secret`] and [`source`]: idempotent writes to the cluster
//! - [`readiness`]: waits for the source controller's verdict

#![deny(missing_docs)]

pub mod address;
pub mod client;
pub mod confirm;
pub mod credentials;
pub mod host_key;
pub mod keygen;
pub mod progress;
pub mod readiness;
pub mod secret;
pub mod source;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

pub use address::{SourceAddress, Transport};
pub use client::{SourceKubeClient, SourceKubeClientImpl};
pub use confirm::{AssumeYes, Confirm};
pub use credentials::{AuthInputs, CredentialBundle, CredentialProvisioner, ProvisionConfig};
pub use host_key::{HostKeyScanner, KnownHost, Ssh2HostKeyScanner};
pub use keygen::{EcdsaCurve, KeyAlgorithm};
pub use progress::{Phase, ProgressReporter, TracingReporter};
pub use readiness::{PollConfig, Readiness, ReadinessPoller};
pub use secret::SecretStore;
pub use source::SourceStore;
pub use workflow::{Outcome, SourceGitWorkflow, SourceRequest};

/// What an upsert did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The object did not exist and was created
    Created,
    /// The object existed and was overwritten
    Updated,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}
