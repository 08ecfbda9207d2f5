//! Progress reporting for the provisioning workflow
//!
//! The workflow emits one event per step; the presentation is up to the
//! reporter. The CLI prints to the terminal, library callers get tracing.

use std::fmt;

use tracing::{error, info};

/// Step category of a progress event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Something is being generated locally
    Generate,
    /// A remote action is being taken
    Action,
    /// Waiting on an external party
    Waiting,
    /// A step completed
    Success,
    /// A step failed
    Failure,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Action => write!(f, "action"),
            Self::Waiting => write!(f, "waiting"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Receives progress events
pub trait ProgressReporter: Send + Sync {
    /// Report one event
    fn report(&self, phase: Phase, message: &str);
}

/// Reporter that forwards events to tracing
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, phase: Phase, message: &str) {
        match phase {
            Phase::Failure => error!(phase = %phase, "{message}"),
            _ => info!(phase = %phase, "{message}"),
        }
    }
}

/// Reporter that keeps every event, for assertions in tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: std::sync::Mutex<Vec<(Phase, String)>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub(crate) fn events(&self) -> Vec<(Phase, String)> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|(_, m)| m).collect()
    }
}

#[cfg(test)]
impl ProgressReporter for RecordingReporter {
    fn report(&self, phase: Phase, message: &str) {
        self.events.lock().unwrap().push((phase, message.to_string()));
    }
}
