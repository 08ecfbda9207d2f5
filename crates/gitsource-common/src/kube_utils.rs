//! Shared Kubernetes helpers
//!
//! Metadata construction, label parsing and export cleanup used by both the
//! provisioning workflow and the CLI.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::Error;

/// Maximum length of a label name (the part after an optional prefix)
const MAX_LABEL_NAME_LEN: usize = 63;

/// Maximum length of a label prefix (a DNS subdomain)
const MAX_LABEL_PREFIX_LEN: usize = 253;

/// Build metadata for a namespaced object owned by this run
pub fn namespaced_meta(
    name: impl Into<String>,
    namespace: impl Into<String>,
    labels: &BTreeMap<String, String>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        namespace: Some(namespace.into()),
        labels: (!labels.is_empty()).then(|| labels.clone()),
        ..Default::default()
    }
}

/// Strip server-assigned metadata from a resource for export.
///
/// Removes fields that only make sense for an object already stored in a
/// cluster:
/// - uid
/// - resourceVersion
/// - creationTimestamp
/// - managedFields
/// - generation
pub fn strip_export_metadata(meta: &mut ObjectMeta) {
    meta.uid = None;
    meta.resource_version = None;
    meta.creation_timestamp = None;
    meta.managed_fields = None;
    meta.generation = None;
}

/// Parse `key=value` label arguments into a label map
///
/// Later entries override earlier ones with the same key.
pub fn parse_labels<S: AsRef<str>>(entries: &[S]) -> Result<BTreeMap<String, String>, Error> {
    let mut labels = BTreeMap::new();
    for entry in entries {
        let entry = entry.as_ref();
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            Error::invalid_selection_for(
                "--label",
                format!("invalid label format {entry:?}, expected key=value"),
            )
        })?;
        validate_label_key(key)?;
        validate_label_value(value)?;
        labels.insert(key.to_string(), value.to_string());
    }
    Ok(labels)
}

fn validate_label_key(key: &str) -> Result<(), Error> {
    let (prefix, name) = match key.rsplit_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        let valid_prefix = !prefix.is_empty()
            && prefix.len() <= MAX_LABEL_PREFIX_LEN
            && prefix.split('.').all(|part| {
                !part.is_empty()
                    && part
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                    && !part.starts_with('-')
                    && !part.ends_with('-')
            });
        if !valid_prefix {
            return Err(Error::invalid_selection_for(
                "--label",
                format!("invalid label key prefix {prefix:?}"),
            ));
        }
    }

    if !is_label_token(name) || name.is_empty() {
        return Err(Error::invalid_selection_for(
            "--label",
            format!("invalid label key {key:?}"),
        ));
    }
    Ok(())
}

fn validate_label_value(value: &str) -> Result<(), Error> {
    if value.is_empty() || is_label_token(value) {
        Ok(())
    } else {
        Err(Error::invalid_selection_for(
            "--label",
            format!("invalid label value {value:?}"),
        ))
    }
}

/// Alphanumeric start and end, `-`, `_` and `.` in between, at most 63 chars
fn is_label_token(s: &str) -> bool {
    let bytes = s.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            s.len() <= MAX_LABEL_NAME_LEN
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        }
        _ => false,
    }
}
