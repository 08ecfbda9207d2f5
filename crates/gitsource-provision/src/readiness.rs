//! Readiness polling for GitRepository sources
//!
//! The source controller reports progress asynchronously through status
//! conditions. This module turns that into a single outcome:
//!
//! - `Ready=True` on the current generation: ready
//! - `Ready=False`: failed, with the controller's message verbatim
//! - anything else (no status, no Ready condition, `Ready=Unknown`, or a
//!   condition computed for an older generation): still pending
//!
//! Pending sources are re-read at a fixed interval until an overall deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use gitsource_common::crd::{
    Artifact, ConditionStatus, ConditionType, GitRepository, GIT_REPOSITORY_KIND,
};
use gitsource_common::Error;

use crate::client::SourceKubeClient;

/// Default delay between status reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default overall reconciliation budget
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Shortest delay between status reads; smaller intervals are raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Polling cadence and deadline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between reads
    pub interval: Duration,
    /// Overall budget, measured from the first read
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Interpretation of one observation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// No verdict yet
    Pending,
    /// The controller fetched the source
    Ready,
    /// The controller gave a negative verdict
    Failed(String),
}

/// Interpret the observed status of a source
pub fn evaluate(repository: &GitRepository) -> Readiness {
    let Some(status) = repository.status.as_ref() else {
        return Readiness::Pending;
    };

    if let (Some(observed), Some(generation)) =
        (status.observed_generation, repository.metadata.generation)
    {
        if observed < generation {
            return Readiness::Pending;
        }
    }

    match repository.condition_index().get(&ConditionType::Ready) {
        Some(ready) => match ready.status {
            ConditionStatus::True => Readiness::Ready,
            ConditionStatus::False => Readiness::Failed(ready.message.clone()),
            ConditionStatus::Unknown => Readiness::Pending,
        },
        None => Readiness::Pending,
    }
}

/// The artifact of a Ready source, or [`Error::ArtifactMissing`]
pub fn fetched_artifact(repository: &GitRepository) -> Result<&Artifact, Error> {
    repository.artifact().ok_or_else(|| Error::ArtifactMissing {
        kind: GIT_REPOSITORY_KIND.to_string(),
        namespace: repository.metadata.namespace.clone().unwrap_or_default(),
        name: repository.metadata.name.clone().unwrap_or_default(),
    })
}

/// Waits for a source to reach a terminal readiness state
pub struct ReadinessPoller {
    client: Arc<dyn SourceKubeClient>,
    config: PollConfig,
}

impl ReadinessPoller {
    /// Create a poller
    pub fn new(client: Arc<dyn SourceKubeClient>, config: PollConfig) -> Self {
        Self { client, config }
    }

    /// Poll `namespace/name` until Ready, failed, timed out or cancelled
    ///
    /// Reads immediately, then once per interval. Read errors end the wait
    /// at once; they are not retried. A zero timeout expires before the
    /// first read.
    pub async fn wait_ready(
        &self,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<GitRepository, Error> {
        let deadline = Instant::now() + self.config.timeout;
        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        let mut ticker = tokio::time::interval(self.config.interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let timeout = || {
            Error::timeout(
                format!("{GIT_REPOSITORY_KIND} {namespace}/{name} to become ready"),
                self.config.timeout,
            )
        };
        let canceled = || Error::canceled(format!("stopped waiting for {namespace}/{name}"));

        if self.config.timeout.is_zero() {
            return Err(timeout());
        }

        let mut attempt: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(canceled()),
                _ = &mut expired => return Err(timeout()),
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let observed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(canceled()),
                _ = &mut expired => return Err(timeout()),
                result = self.client.get_git_repository(namespace, name) => result?,
            };

            let repository = observed
                .ok_or_else(|| Error::not_found(GIT_REPOSITORY_KIND, namespace, name))?;

            match evaluate(&repository) {
                Readiness::Ready => {
                    debug!(namespace = %namespace, name = %name, attempt, "source is ready");
                    return Ok(repository);
                }
                Readiness::Failed(message) => {
                    return Err(Error::ReconciliationFailed {
                        kind: GIT_REPOSITORY_KIND.to_string(),
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                        message,
                    });
                }
                Readiness::Pending => {
                    trace!(namespace = %namespace, name = %name, attempt, "source not ready yet");
                }
            }
        }
    }
}
