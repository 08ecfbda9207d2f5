//! Terminal rendering of workflow progress

use std::io::{self, Write};
use std::sync::Mutex;

use gitsource_provision::{Phase, ProgressReporter};
use tracing::debug;

/// Marker printed in front of each progress line
pub fn symbol(phase: Phase) -> &'static str {
    match phase {
        Phase::Generate => "✚",
        Phase::Action => "►",
        Phase::Waiting => "◎",
        Phase::Success => "✔",
        Phase::Failure => "✗",
    }
}

/// Writes one line per progress event, mirroring it to tracing at debug
pub struct ConsoleReporter<W: Write + Send = io::Stderr> {
    out: Mutex<W>,
}

impl ConsoleReporter<io::Stderr> {
    /// Reporter writing to standard error
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    /// Reporter writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> ProgressReporter for ConsoleReporter<W> {
    fn report(&self, phase: Phase, message: &str) {
        debug!(phase = %phase, "{message}");
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Progress output is best effort; a closed stderr must not fail the run
        let _ = writeln!(out, "{} {}", symbol(phase), message);
    }
}
