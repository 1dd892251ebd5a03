//! Backoff policies applied between connection attempts on one transport.
//!
//! A [`BackoffPolicy`] maps a transport's attempt counter to the delay the
//! engine waits before connecting. The interval shape is pluggable through
//! [`IntervalFunction`]; the policy adds the "first attempt is immediate"
//! rule and the [`BackoffReset`] behavior on top.

use crate::error::ConfigError;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default delay before the first retry on a transport.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1500);

/// Default ceiling for retry delays.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(300);

/// Default growth factor between consecutive retries.
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Computes the wait before a retry.
///
/// `step` is zero-based: step 0 is the first retry, which waits the initial
/// interval.
pub trait IntervalFunction: Send + Sync {
    /// Returns the interval for the given retry step.
    fn next_interval(&self, step: u32) -> Duration;
}

/// The same interval for every retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    /// Creates a fixed interval.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Rejects a zero interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::InvalidBackoff(
                "fixed delay must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _step: u32) -> Duration {
        self.interval
    }
}

/// Interval growing by a constant factor per retry, capped at a maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    max: Duration,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff starting at `initial`.
    ///
    /// Defaults: multiplier 1.5, ceiling 300 seconds, no jitter.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            multiplier: DEFAULT_MULTIPLIER,
            max: DEFAULT_MAX_DELAY.max(initial),
            jitter: 0.0,
        }
    }

    /// Sets the growth factor applied per retry.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the ceiling.
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    /// Sets the randomization factor in `[0, 1]`.
    ///
    /// Delays are spread uniformly over `delay * (1 +/- jitter)` and clamped to
    /// `[initial, max]`. With jitter the sequence is no longer monotonic.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Initial interval.
    pub fn initial_interval(&self) -> Duration {
        self.initial
    }

    /// Ceiling.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Checks that the parameters describe a usable backoff.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial.is_zero() {
            return Err(ConfigError::InvalidBackoff(
                "initial delay must be greater than zero".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoff(format!(
                "multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max < self.initial {
            return Err(ConfigError::InvalidBackoff(format!(
                "max delay {:?} is below initial delay {:?}",
                self.max, self.initial
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidBackoff(format!(
                "jitter must be within [0, 1], got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, step: u32) -> Duration {
        let exponent = i32::try_from(step).unwrap_or(i32::MAX);
        let max_secs = self.max.as_secs_f64();
        let mut secs = (self.initial.as_secs_f64() * self.multiplier.powi(exponent)).min(max_secs);

        if self.jitter > 0.0 {
            let spread = secs * self.jitter;
            secs += rand::rng().random_range(-spread..=spread);
            secs = secs.clamp(self.initial.as_secs_f64(), max_secs);
        }

        Duration::try_from_secs_f64(secs).unwrap_or(self.max)
    }
}

/// Interval computed by a closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    /// Wraps a closure mapping a retry step to an interval.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn next_interval(&self, step: u32) -> Duration {
        (self.f)(step)
    }
}

/// Whether a transport's backoff rewinds after the cursor visits other transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffReset {
    /// Delays keep growing across cycles.
    Never,
    /// When the cursor returns to a transport after an attempt on a different
    /// one, its next delay starts over from the initial interval.
    #[default]
    OnCycleReturn,
}

/// Interval shape used by a [`BackoffPolicy`].
#[derive(Clone)]
pub enum BackoffStrategy {
    /// Constant delay.
    Fixed(FixedInterval),
    /// Growing delay.
    Exponential(ExponentialBackoff),
    /// Caller-supplied function.
    Custom(Arc<dyn IntervalFunction>),
}

impl fmt::Debug for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(i) => f.debug_tuple("Fixed").field(i).finish(),
            Self::Exponential(e) => f.debug_tuple("Exponential").field(e).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Per-transport delay policy.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    strategy: BackoffStrategy,
    immediate_first_attempt: bool,
    reset: BackoffReset,
}

impl BackoffPolicy {
    /// Exponential backoff from `initial` up to `max`, multiplier 1.5.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self::from_strategy(BackoffStrategy::Exponential(
            ExponentialBackoff::new(initial).max_interval(max),
        ))
    }

    /// Constant delay between attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self::from_strategy(BackoffStrategy::Fixed(FixedInterval::new(delay)))
    }

    /// Delay computed by a custom interval function.
    pub fn custom<I>(interval: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        Self::from_strategy(BackoffStrategy::Custom(Arc::new(interval)))
    }

    /// Wraps any strategy with the default first-attempt and reset rules.
    pub fn from_strategy(strategy: BackoffStrategy) -> Self {
        Self {
            strategy,
            immediate_first_attempt: true,
            reset: BackoffReset::default(),
        }
    }

    /// Whether the very first attempt on a transport skips the wait. Default `true`.
    pub fn immediate_first_attempt(mut self, immediate: bool) -> Self {
        self.immediate_first_attempt = immediate;
        self
    }

    /// Sets the reset behavior. Default [`BackoffReset::OnCycleReturn`].
    pub fn reset(mut self, reset: BackoffReset) -> Self {
        self.reset = reset;
        self
    }

    /// The configured reset behavior.
    pub fn reset_mode(&self) -> BackoffReset {
        self.reset
    }

    /// The interval shape.
    pub fn strategy(&self) -> &BackoffStrategy {
        &self.strategy
    }

    /// Checks the underlying strategy's parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.strategy {
            BackoffStrategy::Exponential(e) => e.validate(),
            BackoffStrategy::Fixed(i) => i.validate(),
            BackoffStrategy::Custom(_) => Ok(()),
        }
    }

    /// Delay before the attempt numbered `attempt` (1-based).
    ///
    /// Attempt 1 waits nothing when the first attempt is immediate; later
    /// attempts walk the interval function from step 0.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let step = if self.immediate_first_attempt {
            if attempt == 1 {
                return Duration::ZERO;
            }
            attempt - 2
        } else {
            attempt - 1
        };

        match &self.strategy {
            BackoffStrategy::Fixed(i) => i.next_interval(step),
            BackoffStrategy::Exponential(e) => e.next_interval(step),
            BackoffStrategy::Custom(f) => f.next_interval(step),
        }
    }

    /// Attempt counter value a reset rewinds to.
    ///
    /// The next recorded attempt after a reset waits the initial interval,
    /// never the immediate first-attempt slot.
    pub fn rewind_step(&self) -> u32 {
        if self.immediate_first_attempt { 1 } else { 0 }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY)
    }
}
