//! Confirmation gate between key generation and publication

#[cfg(test)]
use mockall::automock;

use gitsource_common::Error;

/// Asks the operator whether to continue
///
/// Implementations may block on terminal input; callers run them off the
/// async executor.
#[cfg_attr(test, automock)]
pub trait Confirm: Send + Sync {
    /// Returns `Ok(true)` to proceed and `Ok(false)` to abort
    fn confirm(&self, prompt: &str) -> Result<bool, Error>;
}

/// Non-interactive confirmation that always proceeds
#[derive(Clone, Copy, Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool, Error> {
        Ok(true)
    }
}
