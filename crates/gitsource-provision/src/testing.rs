//! In-memory API server stand-in for tests
//!
//! Behaves like the real server for the calls this crate makes: create on an
//! existing name is a conflict, replace requires a matching resourceVersion,
//! status survives spec updates and spec changes bump the generation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;

use gitsource_common::crd::{
    GitRepository, GitRepositorySpec, GitRepositoryStatus, RevisionSelector, GIT_REPOSITORY_KIND,
};
use gitsource_common::kube_utils::namespaced_meta;
use gitsource_common::Error;

use crate::client::{SourceKubeClient, SECRET_KIND};

type Key = (String, String);

#[derive(Default)]
struct State {
    secrets: BTreeMap<Key, Secret>,
    repositories: BTreeMap<Key, GitRepository>,
    revision: u64,
}

impl State {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }
}

#[derive(Default)]
pub(crate) struct FakeKubeClient {
    state: Mutex<State>,
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

impl FakeKubeClient {
    pub(crate) fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state.lock().unwrap().secrets.get(&key(namespace, name)).cloned()
    }

    pub(crate) fn secret_count(&self) -> usize {
        self.state.lock().unwrap().secrets.len()
    }

    pub(crate) fn git_repository(&self, namespace: &str, name: &str) -> Option<GitRepository> {
        self.state
            .lock()
            .unwrap()
            .repositories
            .get(&key(namespace, name))
            .cloned()
    }

    pub(crate) fn git_repository_count(&self) -> usize {
        self.state.lock().unwrap().repositories.len()
    }

    /// Write status the way the source controller would
    pub(crate) fn set_git_repository_status(
        &self,
        namespace: &str,
        name: &str,
        status: GitRepositoryStatus,
    ) {
        let mut state = self.state.lock().unwrap();
        if let Some(repo) = state.repositories.get_mut(&key(namespace, name)) {
            repo.status = Some(status);
        }
    }
}

#[async_trait]
impl SourceKubeClient for FakeKubeClient {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error> {
        Ok(self.secret(namespace, name))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, Error> {
        let mut state = self.state.lock().unwrap();
        let name = secret.metadata.name.clone().unwrap_or_default();
        let k = key(namespace, &name);
        if state.secrets.contains_key(&k) {
            return Err(Error::conflict(SECRET_KIND, namespace, name, "already exists"));
        }
        let mut stored = secret.clone();
        stored.metadata.uid = Some(format!("secret-{}", state.revision + 1));
        stored.metadata.resource_version = Some(state.next_revision());
        state.secrets.insert(k, stored.clone());
        Ok(stored)
    }

    async fn replace_secret(
        &self,
        namespace: &str,
        name: &str,
        secret: &Secret,
    ) -> Result<Secret, Error> {
        let mut state = self.state.lock().unwrap();
        let k = key(namespace, name);
        let current = state
            .secrets
            .get(&k)
            .cloned()
            .ok_or_else(|| Error::not_found(SECRET_KIND, namespace, name))?;
        if secret.metadata.resource_version.is_some()
            && secret.metadata.resource_version != current.metadata.resource_version
        {
            return Err(Error::conflict(
                SECRET_KIND,
                namespace,
                name,
                "the object has been modified",
            ));
        }
        let mut stored = secret.clone();
        stored.metadata.uid = current.metadata.uid;
        stored.metadata.resource_version = Some(state.next_revision());
        state.secrets.insert(k, stored.clone());
        Ok(stored)
    }

    async fn get_git_repository(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<GitRepository>, Error> {
        Ok(self.git_repository(namespace, name))
    }

    async fn create_git_repository(
        &self,
        namespace: &str,
        repository: &GitRepository,
    ) -> Result<GitRepository, Error> {
        let mut state = self.state.lock().unwrap();
        let name = repository.metadata.name.clone().unwrap_or_default();
        let k = key(namespace, &name);
        if state.repositories.contains_key(&k) {
            return Err(Error::conflict(
                GIT_REPOSITORY_KIND,
                namespace,
                name,
                "already exists",
            ));
        }
        let mut stored = repository.clone();
        stored.status = None;
        stored.metadata.uid = Some(format!("gitrepository-{}", state.revision + 1));
        stored.metadata.generation = Some(1);
        stored.metadata.resource_version = Some(state.next_revision());
        state.repositories.insert(k, stored.clone());
        Ok(stored)
    }

    async fn replace_git_repository(
        &self,
        namespace: &str,
        name: &str,
        repository: &GitRepository,
    ) -> Result<GitRepository, Error> {
        let mut state = self.state.lock().unwrap();
        let k = key(namespace, name);
        let current = state
            .repositories
            .get(&k)
            .cloned()
            .ok_or_else(|| Error::not_found(GIT_REPOSITORY_KIND, namespace, name))?;
        if repository.metadata.resource_version.is_some()
            && repository.metadata.resource_version != current.metadata.resource_version
        {
            return Err(Error::conflict(
                GIT_REPOSITORY_KIND,
                namespace,
                name,
                "the object has been modified",
            ));
        }
        let mut stored = repository.clone();
        stored.status = current.status.clone();
        stored.metadata.uid = current.metadata.uid.clone();
        let generation = current.metadata.generation.unwrap_or(1);
        stored.metadata.generation = Some(if current.spec == repository.spec {
            generation
        } else {
            generation + 1
        });
        stored.metadata.resource_version = Some(state.next_revision());
        state.repositories.insert(k, stored.clone());
        Ok(stored)
    }
}

/// A minimal desired GitRepository in `flux-system`
pub(crate) fn git_repository(name: &str, url: &str) -> GitRepository {
    GitRepository {
        metadata: namespaced_meta(name, "flux-system", &BTreeMap::new()),
        spec: GitRepositorySpec {
            url: url.to_string(),
            secret_ref: None,
            interval: "1m0s".to_string(),
            timeout: None,
            reference: Some(RevisionSelector::default().to_ref()),
            git_implementation: None,
        },
        status: None,
    }
}
