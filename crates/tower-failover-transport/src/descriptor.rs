//! Per-transport retry bookkeeping.

use crate::backoff::{BackoffPolicy, BackoffReset};
use crate::config::TransportConfig;
use std::sync::Arc;
use std::time::Duration;

/// One configured way to reach the service, with its retry budget and
/// backoff progress.
///
/// A descriptor is owned by exactly one reconnection engine and only mutated
/// by it. Disqualification and budget exhaustion are permanent.
#[derive(Debug, Clone)]
pub struct Transport {
    index: usize,
    config: Arc<TransportConfig>,
    retries_remaining: Option<u32>,
    attempt_count: u32,
    backoff_step: u32,
    failures: u32,
    successes: u32,
    failed: bool,
}

impl Transport {
    /// Creates a descriptor at position `index` of the configured list.
    pub fn new(index: usize, config: TransportConfig) -> Self {
        Self::from_shared(index, Arc::new(config))
    }

    /// Creates a descriptor around an already shared configuration.
    pub fn from_shared(index: usize, config: Arc<TransportConfig>) -> Self {
        Self {
            index,
            retries_remaining: config.retry_budget(),
            config,
            attempt_count: 0,
            backoff_step: 0,
            failures: 0,
            successes: 0,
            failed: false,
        }
    }

    /// Position in the configured list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The validated configuration handed to the connector.
    pub fn config(&self) -> &Arc<TransportConfig> {
        &self.config
    }

    /// True iff the transport is not disqualified and has budget left.
    pub fn can_retry(&self) -> bool {
        !self.failed && self.retries_remaining.is_none_or(|left| left > 0)
    }

    /// Counts an attempt; called right before connecting.
    pub fn record_attempt(&mut self) {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.backoff_step = self.backoff_step.saturating_add(1);
    }

    /// Consumes one unit of retry budget, if bounded.
    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        if let Some(left) = self.retries_remaining.as_mut() {
            *left = left.saturating_sub(1);
        }
    }

    /// Counts a session that ran to completion.
    pub fn record_success(&mut self) {
        self.successes = self.successes.saturating_add(1);
    }

    /// Disqualifies the transport for good.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Rewinds the backoff after the cursor visited other transports, if the
    /// policy asks for it. Returns true when the backoff was rewound.
    ///
    /// Only transports that have already been attempted are affected.
    pub fn rewind_backoff(&mut self) -> bool {
        let policy = self.config.backoff_policy();
        let target = policy.rewind_step();
        if policy.reset_mode() == BackoffReset::OnCycleReturn && self.backoff_step > target {
            self.backoff_step = target;
            true
        } else {
            false
        }
    }

    /// Delay before the attempt just recorded.
    pub fn next_delay(&self) -> Duration {
        self.backoff().next_delay(self.backoff_step)
    }

    /// The transport's backoff policy.
    pub fn backoff(&self) -> &BackoffPolicy {
        self.config.backoff_policy()
    }

    /// Remaining budget; `None` means unbounded.
    pub fn retries_remaining(&self) -> Option<u32> {
        self.retries_remaining
    }

    /// Attempts made so far.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Step currently fed to the backoff policy.
    pub fn backoff_step(&self) -> u32 {
        self.backoff_step
    }

    /// Failed attempts so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Completed sessions so far.
    pub fn successes(&self) -> u32 {
        self.successes
    }

    /// Whether the transport was disqualified.
    pub fn is_failed(&self) -> bool {
        self.failed
    }
}
