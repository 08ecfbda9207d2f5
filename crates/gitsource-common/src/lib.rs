//! Common types for gitsource: the GitRepository CRD, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod duration;
pub mod error;
pub mod kube_utils;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace the Flux controllers are installed into by default
pub const DEFAULT_NAMESPACE: &str = "flux-system";

/// Secret key holding the generated private key
pub const SECRET_KEY_IDENTITY: &str = "identity";

/// Secret key holding the generated public key
pub const SECRET_KEY_IDENTITY_PUB: &str = "identity.pub";

/// Secret key holding the collected host key line
pub const SECRET_KEY_KNOWN_HOSTS: &str = "known_hosts";

/// Secret key holding the basic-auth username
pub const SECRET_KEY_USERNAME: &str = "username";

/// Secret key holding the basic-auth password
pub const SECRET_KEY_PASSWORD: &str = "password";
