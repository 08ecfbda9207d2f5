//! Manifest export

use gitsource_common::crd::GitRepository;
use gitsource_common::kube_utils::strip_export_metadata;

use crate::Result;

/// Render a GitRepository as a standalone YAML document
///
/// Server-assigned metadata and status are dropped so the output can be
/// committed and applied elsewhere.
pub fn to_yaml(repository: &GitRepository) -> Result<String> {
    let mut repository = repository.clone();
    strip_export_metadata(&mut repository.metadata);
    repository.status = None;
    let yaml = serde_yaml::to_string(&repository)?;
    Ok(format!("---\n{yaml}"))
}
