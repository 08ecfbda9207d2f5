//! Kubernetes client seam for the provisioning workflow
//!
//! Provides a trait-based abstraction over the two resource kinds this crate
//! touches, allowing tests to mock the API server while production code uses
//! real API calls.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use gitsource_common::crd::{GitRepository, GIT_REPOSITORY_KIND};
use gitsource_common::error::{is_conflict, is_not_found};
use gitsource_common::Error;

/// Kind name of the credentials object
pub const SECRET_KIND: &str = "Secret";

/// Trait abstracting the get/create/replace calls against the control plane
///
/// `get_*` returns `Ok(None)` when the object does not exist. Write calls
/// report HTTP 409 as [`Error::Conflict`] and pass every other API error
/// through unmodified.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SourceKubeClient: Send + Sync {
    /// Get a Secret by namespace and name
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error>;

    /// Create a Secret
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, Error>;

    /// Replace an existing Secret (full PUT, guarded by its resourceVersion)
    async fn replace_secret(
        &self,
        namespace: &str,
        name: &str,
        secret: &Secret,
    ) -> Result<Secret, Error>;

    /// Get a GitRepository by namespace and name
    async fn get_git_repository(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<GitRepository>, Error>;

    /// Create a GitRepository
    async fn create_git_repository(
        &self,
        namespace: &str,
        repository: &GitRepository,
    ) -> Result<GitRepository, Error>;

    /// Replace an existing GitRepository (full PUT, guarded by its resourceVersion)
    async fn replace_git_repository(
        &self,
        namespace: &str,
        name: &str,
        repository: &GitRepository,
    ) -> Result<GitRepository, Error>;
}

/// Real Kubernetes client implementation
pub struct SourceKubeClientImpl {
    client: Client,
}

impl SourceKubeClientImpl {
    /// Create a new SourceKubeClientImpl wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Map a write error, turning 409 into a typed conflict
fn write_error(kind: &str, namespace: &str, name: &str, err: kube::Error) -> Error {
    if is_conflict(&err) {
        let message = match &err {
            kube::Error::Api(ae) => ae.message.clone(),
            other => other.to_string(),
        };
        Error::conflict(kind, namespace, name, message)
    } else {
        err.into()
    }
}

#[async_trait]
impl SourceKubeClient for SourceKubeClientImpl {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(secret) => Ok(Some(secret)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let name = secret.metadata.name.as_deref().unwrap_or_default();
        debug!(namespace = %namespace, name = %name, "creating Secret");
        api.create(&PostParams::default(), secret)
            .await
            .map_err(|e| write_error(SECRET_KIND, namespace, name, e))
    }

    async fn replace_secret(
        &self,
        namespace: &str,
        name: &str,
        secret: &Secret,
    ) -> Result<Secret, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        debug!(namespace = %namespace, name = %name, "replacing Secret");
        api.replace(name, &PostParams::default(), secret)
            .await
            .map_err(|e| write_error(SECRET_KIND, namespace, name, e))
    }

    async fn get_git_repository(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<GitRepository>, Error> {
        let api: Api<GitRepository> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(repo) => Ok(Some(repo)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_git_repository(
        &self,
        namespace: &str,
        repository: &GitRepository,
    ) -> Result<GitRepository, Error> {
        let api: Api<GitRepository> = Api::namespaced(self.client.clone(), namespace);
        let name = repository.metadata.name.as_deref().unwrap_or_default();
        debug!(namespace = %namespace, name = %name, "creating GitRepository");
        api.create(&PostParams::default(), repository)
            .await
            .map_err(|e| write_error(GIT_REPOSITORY_KIND, namespace, name, e))
    }

    async fn replace_git_repository(
        &self,
        namespace: &str,
        name: &str,
        repository: &GitRepository,
    ) -> Result<GitRepository, Error> {
        let api: Api<GitRepository> = Api::namespaced(self.client.clone(), namespace);
        debug!(namespace = %namespace, name = %name, "replacing GitRepository");
        api.replace(name, &PostParams::default(), repository)
            .await
            .map_err(|e| write_error(GIT_REPOSITORY_KIND, namespace, name, e))
    }
}
