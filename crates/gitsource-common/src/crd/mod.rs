//! Custom Resource Definitions used by gitsource
//!
//! Only the Flux `GitRepository` source is modelled. The source controller
//! owns the CRD installation; these types exist for typed API access.

mod git_repository;
mod types;

pub use git_repository::{
    Artifact, GitImplementation, GitRepository, GitRepositoryRef, GitRepositorySpec,
    GitRepositoryStatus, RevisionSelector, SecretReference, DEFAULT_BRANCH, GIT_REPOSITORY_KIND,
};
pub use types::{Condition, ConditionIndex, ConditionState, ConditionStatus, ConditionType};
