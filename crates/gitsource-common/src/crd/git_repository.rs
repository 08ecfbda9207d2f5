//! GitRepository Custom Resource Definition
//!
//! Mirrors the Flux source-controller `GitRepository` (v1beta1). This crate
//! only writes the spec and reads the status; the controller owns the status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, ConditionIndex};
use crate::Error;

/// Kind name of the source resource
pub const GIT_REPOSITORY_KIND: &str = "GitRepository";

/// Branch used when neither a tag nor a semver range is given
pub const DEFAULT_BRANCH: &str = "master";

/// Reference to a Secret in the same namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct SecretReference {
    /// Secret name
    pub name: String,
}

/// Git reference to check out
///
/// The controller gives precedence to semver, then tag, then branch. This
/// crate only ever sets one of them, see [`RevisionSelector`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct GitRepositoryRef {
    /// Branch to check out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Tag to check out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Semver range of tags to choose from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver: Option<String>,

    /// Commit SHA to check out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// Which revision of the repository the source tracks
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevisionSelector {
    /// Track the head of a branch
    Branch(String),
    /// Pin to a tag
    Tag(String),
    /// Follow the highest tag matching a semver range
    SemVer(String),
}

impl RevisionSelector {
    /// Pick the selector from the three optional inputs
    ///
    /// A non-empty semver range wins over a tag, which wins over the branch.
    /// The branch is only used when both are empty, and must then be non-empty.
    pub fn from_inputs(branch: &str, tag: &str, semver: &str) -> Result<Self, Error> {
        if !semver.trim().is_empty() {
            return Ok(Self::SemVer(semver.trim().to_string()));
        }
        if !tag.trim().is_empty() {
            return Ok(Self::Tag(tag.trim().to_string()));
        }
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(Error::invalid_selection_for(
                "--branch",
                "a branch is required when neither a tag nor a semver range is set",
            ));
        }
        Ok(Self::Branch(branch.to_string()))
    }

    /// Render as the `spec.ref` block
    pub fn to_ref(&self) -> GitRepositoryRef {
        match self {
            Self::Branch(b) => GitRepositoryRef {
                branch: Some(b.clone()),
                ..Default::default()
            },
            Self::Tag(t) => GitRepositoryRef {
                tag: Some(t.clone()),
                ..Default::default()
            },
            Self::SemVer(s) => GitRepositoryRef {
                semver: Some(s.clone()),
                ..Default::default()
            },
        }
    }
}

impl Default for RevisionSelector {
    fn default() -> Self {
        Self::Branch(DEFAULT_BRANCH.to_string())
    }
}

impl fmt::Display for RevisionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(b) => write!(f, "branch {b}"),
            Self::Tag(t) => write!(f, "tag {t}"),
            Self::SemVer(s) => write!(f, "semver {s}"),
        }
    }
}

/// Git client library the controller should use for this source
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum GitImplementation {
    /// Pure Go implementation
    #[serde(rename = "go-git")]
    GoGit,
    /// libgit2 bindings
    #[serde(rename = "libgit2")]
    Libgit2,
}

impl FromStr for GitImplementation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "go-git" => Ok(Self::GoGit),
            "libgit2" => Ok(Self::Libgit2),
            other => Err(Error::invalid_selection_for(
                "--git-implementation",
                format!("invalid git implementation {other:?}, expected one of: go-git, libgit2"),
            )),
        }
    }
}

impl fmt::Display for GitImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoGit => write!(f, "go-git"),
            Self::Libgit2 => write!(f, "libgit2"),
        }
    }
}

/// Record of a revision the controller fetched and stored
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Relative path of the artifact in the controller's storage
    #[serde(default)]
    pub path: String,

    /// HTTP address the artifact is served from
    #[serde(default)]
    pub url: String,

    /// Revision identifier, e.g. `main/3f2a...`
    #[serde(default)]
    pub revision: String,

    /// Checksum of the artifact contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// When the artifact was last updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,
}

/// Observed state of a GitRepository
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositoryStatus {
    /// Last generation the controller reconciled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Address of the latest artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// The last successfully fetched revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

/// Desired state of a Git source
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "source.toolkit.fluxcd.io",
    version = "v1beta1",
    kind = "GitRepository",
    plural = "gitrepositories",
    shortname = "gitrepo",
    namespaced,
    status = "GitRepositoryStatus",
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".spec.url"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositorySpec {
    /// Repository address (`https://`, `http://` or `ssh://`)
    pub url: String,

    /// Secret holding `identity`/`known_hosts` or `username`/`password`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretReference>,

    /// How often the controller fetches, as a Go duration (e.g. `1m0s`)
    pub interval: String,

    /// Timeout for remote git operations, as a Go duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Revision to check out
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<GitRepositoryRef>,

    /// Git client library hint for the controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_implementation: Option<GitImplementation>,
}

impl GitRepository {
    /// Index of the currently observed status conditions
    pub fn condition_index(&self) -> ConditionIndex {
        self.status
            .as_ref()
            .map(|s| ConditionIndex::from_conditions(&s.conditions))
            .unwrap_or_default()
    }

    /// The fetched artifact, if the controller recorded one
    pub fn artifact(&self) -> Option<&Artifact> {
        self.status.as_ref().and_then(|s| s.artifact.as_ref())
    }
}
