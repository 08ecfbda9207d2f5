//! Status condition types shared by source resources

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition as written by the source controller
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Ready, Reconciling)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Generation the condition was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Some(Utc::now()),
            observed_generation: None,
        }
    }
}

/// Condition types the source controller is known to publish
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConditionType {
    /// Overall readiness of the resource
    Ready,
    /// The controller is working on the resource
    Reconciling,
    /// The controller gave up until the spec changes
    Stalled,
    /// Fetching from the remote failed
    FetchFailed,
    /// Any type this crate does not interpret
    Other(String),
}

impl ConditionType {
    /// Map a condition type token to its variant
    pub fn parse(token: &str) -> Self {
        match token {
            "Ready" => Self::Ready,
            "Reconciling" => Self::Reconciling,
            "Stalled" => Self::Stalled,
            "FetchFailed" => Self::FetchFailed,
            other => Self::Other(other.to_string()),
        }
    }

    /// The token as written in `status.conditions[].type`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ready => "Ready",
            Self::Reconciling => "Reconciling",
            Self::Stalled => "Stalled",
            Self::FetchFailed => "FetchFailed",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state and message of one observed condition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionState {
    /// Condition status
    pub status: ConditionStatus,
    /// Human-readable message, verbatim
    pub message: String,
}

/// Lookup from condition type to its observed state
///
/// Built once per observation so callers match on [`ConditionType`] instead
/// of comparing type strings. When the controller lists a type more than
/// once, the last entry wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionIndex {
    entries: HashMap<ConditionType, ConditionState>,
}

impl ConditionIndex {
    /// Index a list of conditions
    pub fn from_conditions(conditions: &[Condition]) -> Self {
        let entries = conditions
            .iter()
            .map(|c| {
                (
                    ConditionType::parse(&c.type_),
                    ConditionState {
                        status: c.status,
                        message: c.message.clone(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Get the state of a condition type, if present
    pub fn get(&self, condition_type: &ConditionType) -> Option<&ConditionState> {
        self.entries.get(condition_type)
    }

    /// Number of indexed condition types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no conditions were observed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
