//! End-to-end source provisioning
//!
//! Classify the address, provision credentials, publish the Secret, upsert
//! the GitRepository, then wait for the controller to fetch it. Each step
//! only starts after the previous one succeeded; nothing is rolled back on
//! failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use gitsource_common::crd::{
    GitImplementation, GitRepository, GitRepositorySpec, RevisionSelector, SecretReference,
};
use gitsource_common::duration::format_duration;
use gitsource_common::kube_utils::namespaced_meta;
use gitsource_common::Error;

use crate::address::SourceAddress;
use crate::client::SourceKubeClient;
use crate::credentials::{AuthInputs, CredentialBundle, CredentialProvisioner};
use crate::progress::{Phase, ProgressReporter};
use crate::readiness::{fetched_artifact, PollConfig, ReadinessPoller};
use crate::secret::SecretStore;
use crate::source::SourceStore;
use crate::UpsertOutcome;

/// Everything needed to create one Git source
#[derive(Clone, Debug)]
pub struct SourceRequest {
    /// Resource name; also the name of a managed Secret
    pub name: String,
    /// Target namespace
    pub namespace: String,
    /// Repository address
    pub url: String,
    /// Revision to track
    pub revision: RevisionSelector,
    /// Fetch interval
    pub interval: std::time::Duration,
    /// Labels for both the Secret and the GitRepository
    pub labels: BTreeMap<String, String>,
    /// Git client library hint
    pub git_implementation: Option<GitImplementation>,
    /// Authentication inputs
    pub auth: AuthInputs,
}

impl SourceRequest {
    /// Check the inputs that do not need the cluster
    pub fn validate(&self) -> Result<SourceAddress, Error> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_selection_for("name", "source name is required"));
        }
        if self.namespace.trim().is_empty() {
            return Err(Error::invalid_selection_for(
                "--namespace",
                "namespace is required",
            ));
        }
        SourceAddress::parse(&self.url)
    }

    /// Build the complete desired GitRepository
    pub fn to_git_repository(&self, secret_ref: Option<String>) -> GitRepository {
        GitRepository {
            metadata: namespaced_meta(&self.name, &self.namespace, &self.labels),
            spec: GitRepositorySpec {
                url: self.url.trim().to_string(),
                secret_ref: secret_ref.map(|name| SecretReference { name }),
                interval: format_duration(self.interval),
                timeout: None,
                reference: Some(self.revision.to_ref()),
                git_implementation: self.git_implementation,
            },
            status: None,
        }
    }
}

/// Result of a successful run
#[derive(Clone, Debug)]
pub struct Outcome {
    /// The source as last observed
    pub repository: GitRepository,
    /// Whether the source was created or updated
    pub source: UpsertOutcome,
    /// What happened to the managed Secret, if any
    pub secret: Option<UpsertOutcome>,
    /// Revision the controller fetched
    pub revision: String,
}

/// Drives one `create source git` run against a cluster
pub struct SourceGitWorkflow {
    provisioner: CredentialProvisioner,
    secrets: SecretStore,
    sources: SourceStore,
    poller: ReadinessPoller,
    progress: Arc<dyn ProgressReporter>,
}

impl SourceGitWorkflow {
    /// Assemble a workflow around a shared client
    pub fn new(
        client: Arc<dyn SourceKubeClient>,
        provisioner: CredentialProvisioner,
        poll: PollConfig,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            provisioner,
            secrets: SecretStore::new(Arc::clone(&client)),
            sources: SourceStore::new(Arc::clone(&client)),
            poller: ReadinessPoller::new(client, poll),
            progress,
        }
    }

    /// Run every step for `request`
    pub async fn run(
        &self,
        request: &SourceRequest,
        cancel: &CancellationToken,
    ) -> Result<Outcome, Error> {
        let address = request.validate()?;
        info!(
            name = %request.name,
            namespace = %request.namespace,
            transport = %address.transport(),
            "provisioning git source"
        );

        let bundle = self
            .provisioner
            .provision(&address, &request.auth, cancel)
            .await?;

        let mut secret_outcome = None;
        let secret_ref = match &bundle {
            Some(bundle) => {
                if bundle.is_managed() {
                    secret_outcome = Some(self.publish_secret(request, bundle).await?);
                }
                Some(bundle.secret_name(&request.name))
            }
            None => None,
        };

        self.progress
            .report(Phase::Generate, "generating GitRepository source");
        let desired = request.to_git_repository(secret_ref);

        self.progress
            .report(Phase::Action, "applying GitRepository source");
        let (source_outcome, _) = self.sources.upsert(&desired).await?;
        self.progress.report(
            Phase::Success,
            &format!("GitRepository source {source_outcome}"),
        );

        self.progress
            .report(Phase::Waiting, "waiting for GitRepository source reconciliation");
        let repository = self
            .poller
            .wait_ready(&request.namespace, &request.name, cancel)
            .await?;
        self.progress
            .report(Phase::Success, "GitRepository source reconciliation completed");

        let revision = fetched_artifact(&repository)?.revision.clone();
        self.progress
            .report(Phase::Success, &format!("fetched revision: {revision}"));

        Ok(Outcome {
            repository,
            source: source_outcome,
            secret: secret_outcome,
            revision,
        })
    }

    async fn publish_secret(
        &self,
        request: &SourceRequest,
        bundle: &CredentialBundle,
    ) -> Result<UpsertOutcome, Error> {
        let message = match bundle {
            CredentialBundle::BasicAuth { .. } => "applying secret with basic auth credentials",
            _ => "applying secret with keys",
        };
        self.progress.report(Phase::Action, message);

        let outcome = self
            .secrets
            .upsert(
                &request.namespace,
                &bundle.secret_name(&request.name),
                &request.labels,
                &bundle.secret_fields(),
            )
            .await?;
        self.progress
            .report(Phase::Success, "authentication configured");
        Ok(outcome)
    }
}
