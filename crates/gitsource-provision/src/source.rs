//! GitRepository create-or-update

use std::sync::Arc;

use tracing::info;

use gitsource_common::crd::{GitRepository, GIT_REPOSITORY_KIND};
use gitsource_common::Error;

use crate::client::SourceKubeClient;
use crate::UpsertOutcome;

/// Idempotent create-or-replace of GitRepository resources
pub struct SourceStore {
    client: Arc<dyn SourceKubeClient>,
}

impl SourceStore {
    /// Create a store backed by the given client
    pub fn new(client: Arc<dyn SourceKubeClient>) -> Self {
        Self { client }
    }

    /// Apply the complete desired state of `desired`
    ///
    /// When the resource exists, its labels and spec are replaced wholesale
    /// while identity, resourceVersion and status are kept. Returns the
    /// object as stored by the API server.
    pub async fn upsert(
        &self,
        desired: &GitRepository,
    ) -> Result<(UpsertOutcome, GitRepository), Error> {
        let (namespace, name) = match (
            desired.metadata.namespace.as_deref(),
            desired.metadata.name.as_deref(),
        ) {
            (Some(ns), Some(name)) => (ns, name),
            _ => {
                return Err(Error::invalid_selection(format!(
                    "{GIT_REPOSITORY_KIND} requires a name and namespace"
                )))
            }
        };

        match self.client.get_git_repository(namespace, name).await? {
            None => {
                let stored = self.client.create_git_repository(namespace, desired).await?;
                info!(namespace = %namespace, name = %name, "created GitRepository");
                Ok((UpsertOutcome::Created, stored))
            }
            Some(mut existing) => {
                existing.metadata.labels = desired.metadata.labels.clone();
                existing.spec = desired.spec.clone();
                let stored = self
                    .client
                    .replace_git_repository(namespace, name, &existing)
                    .await?;
                info!(namespace = %namespace, name = %name, "updated GitRepository");
                Ok((UpsertOutcome::Updated, stored))
            }
        }
    }
}
