//! Credential Secret publication

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use tracing::info;

use gitsource_common::kube_utils::namespaced_meta;
use gitsource_common::Error;

use crate::client::SourceKubeClient;
use crate::UpsertOutcome;

/// Idempotent create-or-overwrite of credential Secrets
pub struct SecretStore {
    client: Arc<dyn SourceKubeClient>,
}

impl SecretStore {
    /// Create a store backed by the given client
    pub fn new(client: Arc<dyn SourceKubeClient>) -> Self {
        Self { client }
    }

    /// Publish `fields` under `namespace/name`
    ///
    /// An existing Secret keeps its identity and resourceVersion, but its
    /// data is replaced with exactly `fields`; keys it carried before are
    /// dropped. A 409 from a concurrent writer surfaces as
    /// [`Error::Conflict`] and is not retried.
    pub async fn upsert(
        &self,
        namespace: &str,
        name: &str,
        labels: &BTreeMap<String, String>,
        fields: &BTreeMap<String, String>,
    ) -> Result<UpsertOutcome, Error> {
        let data = secret_data(fields);

        match self.client.get_secret(namespace, name).await? {
            None => {
                let secret = Secret {
                    metadata: namespaced_meta(name, namespace, labels),
                    data: Some(data),
                    ..Default::default()
                };
                self.client.create_secret(namespace, &secret).await?;
                info!(namespace = %namespace, name = %name, "created Secret");
                Ok(UpsertOutcome::Created)
            }
            Some(mut existing) => {
                existing.data = Some(data);
                existing.string_data = None;
                if !labels.is_empty() {
                    existing
                        .metadata
                        .labels
                        .get_or_insert_with(BTreeMap::new)
                        .extend(labels.clone());
                }
                self.client.replace_secret(namespace, name, &existing).await?;
                info!(namespace = %namespace, name = %name, "updated Secret");
                Ok(UpsertOutcome::Updated)
            }
        }
    }
}

fn secret_data(fields: &BTreeMap<String, String>) -> BTreeMap<String, ByteString> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), ByteString(v.as_bytes().to_vec())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockSourceKubeClient;
    use crate::testing::FakeKubeClient;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn decoded(secret: &Secret) -> BTreeMap<String, String> {
        secret
            .data
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, String::from_utf8(v.0).unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn absent_secret_is_created_with_exact_fields() {
        let fake = Arc::new(FakeKubeClient::default());
        let store = SecretStore::new(fake.clone());
        let labels = fields(&[("team", "platform")]);

        let outcome = store
            .upsert(
                "flux-system",
                "podinfo",
                &labels,
                &fields(&[("username", "git"), ("password", "token")]),
            )
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Created);
        let stored = fake.secret("flux-system", "podinfo").unwrap();
        assert_eq!(decoded(&stored), fields(&[("username", "git"), ("password", "token")]));
        assert_eq!(stored.metadata.labels, Some(labels));
    }

    #[tokio::test]
    async fn existing_secret_data_is_replaced_not_merged() {
        let fake = Arc::new(FakeKubeClient::default());
        let store = SecretStore::new(fake.clone());
        let empty = BTreeMap::new();

        store
            .upsert(
                "flux-system",
                "podinfo",
                &empty,
                &fields(&[("username", "git"), ("password", "token")]),
            )
            .await
            .unwrap();
        let before = fake.secret("flux-system", "podinfo").unwrap();

        let outcome = store
            .upsert(
                "flux-system",
                "podinfo",
                &empty,
                &fields(&[
                    ("identity", "PRIVATE"),
                    ("identity.pub", "PUBLIC"),
                    ("known_hosts", "github.com ssh-ed25519 AAAA"),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        let after = fake.secret("flux-system", "podinfo").unwrap();
        assert_eq!(
            decoded(&after).keys().collect::<Vec<_>>(),
            vec!["identity", "identity.pub", "known_hosts"]
        );
        assert_eq!(after.metadata.uid, before.metadata.uid);
        assert_eq!(fake.secret_count(), 1);
    }

    #[tokio::test]
    async fn upserting_twice_equals_upserting_once() {
        let fake = Arc::new(FakeKubeClient::default());
        let store = SecretStore::new(fake.clone());
        let labels = fields(&[("app", "podinfo")]);
        let data = fields(&[("username", "git"), ("password", "token")]);

        store
            .upsert("flux-system", "podinfo", &labels, &data)
            .await
            .unwrap();
        let once = fake.secret("flux-system", "podinfo").unwrap();
        store
            .upsert("flux-system", "podinfo", &labels, &data)
            .await
            .unwrap();
        let twice = fake.secret("flux-system", "podinfo").unwrap();

        assert_eq!(decoded(&once), decoded(&twice));
        assert_eq!(once.metadata.labels, twice.metadata.labels);
        assert_eq!(once.metadata.uid, twice.metadata.uid);
        assert_eq!(fake.secret_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_create_surfaces_conflict() {
        let mut mock = MockSourceKubeClient::new();
        mock.expect_get_secret().returning(|_, _| Ok(None));
        mock.expect_create_secret().returning(|ns, secret| {
            Err(Error::conflict(
                "Secret",
                ns,
                secret.metadata.name.clone().unwrap_or_default(),
                "already exists",
            ))
        });
        mock.expect_replace_secret().times(0);
        let store = SecretStore::new(Arc::new(mock));

        let err = store
            .upsert(
                "flux-system",
                "podinfo",
                &BTreeMap::new(),
                &fields(&[("username", "git")]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn read_errors_propagate_unmodified() {
        let mut mock = MockSourceKubeClient::new();
        mock.expect_get_secret().returning(|_, _| {
            Err(Error::Kube {
                source: kube::Error::Api(kube::core::ErrorResponse {
                    status: "Failure".to_string(),
                    message: "secrets is forbidden".to_string(),
                    reason: "Forbidden".to_string(),
                    code: 403,
                }),
            })
        });
        mock.expect_create_secret().times(0);
        let store = SecretStore::new(Arc::new(mock));

        let err = store
            .upsert("flux-system", "podinfo", &BTreeMap::new(), &BTreeMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Kube { .. }));
    }
}
