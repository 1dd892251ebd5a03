//! Lifecycle states of a reconnection engine.

use std::fmt;
use std::time::Duration;

/// How an engine finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// A session ran to completion.
    Success,
    /// A fatal error ended the engine.
    Fatal,
    /// An unclassified error ended the engine.
    Failed,
    /// No transport had budget left.
    Exhausted,
    /// A stop was requested.
    Cancelled,
}

impl Termination {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Success => "success",
            Termination::Fatal => "fatal",
            Termination::Failed => "failed",
            Termination::Exhausted => "exhausted",
            Termination::Cancelled => "cancelled",
        }
    }

    /// Whether this termination is reported as an error.
    pub fn is_error(self) -> bool {
        matches!(self, Termination::Fatal | Termination::Failed)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an engine is in its retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, not started.
    Idle,
    /// Waiting out the backoff before connecting on `transport`.
    WaitingBackoff {
        /// Transport about to be attempted.
        transport: usize,
        /// Length of the wait.
        delay: Duration,
    },
    /// Connected or connecting on `transport`; covers the whole session.
    Connecting {
        /// Transport in use.
        transport: usize,
    },
    /// Finished. No further transitions happen.
    Done(Termination),
}

impl EngineState {
    /// Returns true for [`EngineState::Done`].
    pub fn is_done(&self) -> bool {
        matches!(self, EngineState::Done(_))
    }
}
