//! The reconnection engine: round-robin over transports with per-transport
//! backoff until a session completes, a terminal error occurs, every
//! transport is used up, or a stop is requested.

use crate::attempt::{connect_once, AttemptOutcome, BoxConnector};
use crate::classifier::{Disposition, ErrorClassifier};
use crate::error::{ComponentError, Done};
use crate::events::ComponentEvent;
use crate::run_loop::RunLoop;
use crate::state::{EngineState, Termination};
use crate::stop::StopSignal;
use std::sync::Arc;
use std::time::Instant;
use tower_failover_core::{BoxError, EventListeners};
use tower_failover_transport::Transport;

#[cfg(feature = "tracing")]
use crate::classifier::{find_cause, TlsError};
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Drives one component's retry loop.
///
/// Created by [`Component::start`](crate::Component::start) (or
/// [`Component::into_engine`](crate::Component::into_engine)) and consumed by
/// [`run`](Self::run), so an engine can terminate only once.
pub struct ReconnectEngine {
    name: String,
    transports: Vec<Transport>,
    cursor: usize,
    last_attempted: Option<usize>,
    connector: BoxConnector,
    classifier: Arc<dyn ErrorClassifier>,
    listeners: EventListeners<ComponentEvent>,
    stop: StopSignal,
    state: EngineState,
}

impl ReconnectEngine {
    pub(crate) fn new(
        name: String,
        transports: Vec<Transport>,
        connector: BoxConnector,
        classifier: Arc<dyn ErrorClassifier>,
        listeners: EventListeners<ComponentEvent>,
        stop: StopSignal,
    ) -> Self {
        Self {
            name,
            transports,
            cursor: 0,
            last_attempted: None,
            connector,
            classifier,
            listeners,
            stop,
            state: EngineState::Idle,
        }
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the transport the next cycle will look at.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Transport descriptors in configured order.
    pub fn transports(&self) -> &[Transport] {
        &self.transports
    }

    /// Runs the retry loop to completion.
    ///
    /// Resolves `Ok` on a completed session, on exhaustion and on a stop
    /// request; `Err` on fatal and unclassified failures, carrying the
    /// connector's original error.
    pub async fn run<R>(mut self, run_loop: &R) -> Result<Done, ComponentError>
    where
        R: RunLoop + ?Sized,
    {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            component = %self.name,
            transports = self.transports.len(),
            "entering reconnect loop"
        );

        self.listeners.emit(&ComponentEvent::Started {
            component: self.name.clone(),
            timestamp: Instant::now(),
            transports: self.transports.len(),
        });

        loop {
            if self.stop.is_stopped() {
                return Ok(self.cancel());
            }

            let index = self.advance();

            if !self.transports[index].can_retry() {
                if self.transports.iter().any(Transport::can_retry) {
                    continue;
                }
                #[cfg(feature = "tracing")]
                tracing::info!(component = %self.name, "no remaining transports to try");
                self.finish(Termination::Exhausted);
                return Ok(Done::Exhausted);
            }

            if self.last_attempted.is_some_and(|last| last != index) {
                self.transports[index].rewind_backoff();
            }

            let transport = &mut self.transports[index];
            transport.record_attempt();
            let delay = transport.next_delay();
            let attempt = transport.attempt_count();

            #[cfg(feature = "tracing")]
            tracing::debug!(
                component = %self.name,
                transport = index,
                attempt,
                delay = ?delay,
                "trying transport"
            );
            #[cfg(feature = "metrics")]
            counter!(
                "failover_attempts_total",
                "component" => self.name.clone(),
                "transport" => index.to_string()
            )
            .increment(1);

            self.listeners.emit(&ComponentEvent::Attempt {
                component: self.name.clone(),
                timestamp: Instant::now(),
                transport: index,
                attempt,
                delay,
            });

            self.transition(EngineState::WaitingBackoff {
                transport: index,
                delay,
            });

            // A zero delay still suspends once so siblings on the run loop
            // get polled between attempts.
            let stop = &self.stop;
            let cancelled = if delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = stop.stopped() => true,
                    _ = tokio::task::yield_now() => false,
                }
            } else {
                tokio::select! {
                    _ = run_loop.sleep(delay) => false,
                    _ = stop.stopped() => true,
                }
            };
            if cancelled {
                return Ok(self.cancel());
            }

            self.last_attempted = Some(index);
            self.transition(EngineState::Connecting { transport: index });

            let outcome = connect_once(
                &mut self.connector,
                &self.transports[index],
                self.classifier.as_ref(),
            )
            .await;

            match outcome {
                AttemptOutcome::Success(end) => {
                    self.transports[index].record_success();
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        component = %self.name,
                        transport = index,
                        session = %end,
                        "component completed successfully"
                    );
                    self.finish(Termination::Success);
                    return Ok(Done::Success(end));
                }
                AttemptOutcome::Fatal(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        component = %self.name,
                        transport = index,
                        error = %error,
                        "fatal error, not reconnecting"
                    );
                    self.report_failure(index, Disposition::Fatal, &error);
                    self.finish(Termination::Fatal);
                    return Err(ComponentError::Fatal {
                        component: self.name,
                        transport: index,
                        source: error,
                    });
                }
                AttemptOutcome::Unclassified(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        component = %self.name,
                        transport = index,
                        error = %error,
                        "connection failed"
                    );
                    #[cfg(feature = "tracing")]
                    tracing::debug!(component = %self.name, error = ?error, "connection failure details");
                    self.report_failure(index, Disposition::Unclassified, &error);
                    self.finish(Termination::Failed);
                    return Err(ComponentError::Failed {
                        component: self.name,
                        transport: index,
                        source: error,
                    });
                }
                AttemptOutcome::TransportLocal(error) => {
                    #[cfg(feature = "tracing")]
                    {
                        match find_cause::<TlsError>(&*error) {
                            Some(tls) => {
                                for failure in &tls.failures {
                                    tracing::error!(
                                        component = %self.name,
                                        transport = index,
                                        reason = %failure.reason,
                                        "TLS failure"
                                    );
                                }
                            }
                            None => tracing::error!(
                                component = %self.name,
                                transport = index,
                                error = %error,
                                "transport negotiation failure"
                            ),
                        }
                        tracing::error!(
                            component = %self.name,
                            transport = index,
                            "marking this transport as failed"
                        );
                    }
                    self.report_failure(index, Disposition::TransportLocal, &error);
                    let transport = &mut self.transports[index];
                    transport.mark_failed();
                    transport.record_failure();
                    self.listeners.emit(&ComponentEvent::Disqualified {
                        component: self.name.clone(),
                        timestamp: Instant::now(),
                        transport: index,
                    });
                }
                AttemptOutcome::Retryable(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        component = %self.name,
                        transport = index,
                        error = %error,
                        "attempt failed, will retry"
                    );
                    self.report_failure(index, Disposition::Retryable, &error);
                    self.transports[index].record_failure();
                }
            }

            #[cfg(feature = "metrics")]
            gauge!("failover_eligible_transports", "component" => self.name.clone())
                .set(self.transports.iter().filter(|t| t.can_retry()).count() as f64);
        }
    }

    /// Returns the cursor position and moves the cursor to the next
    /// transport, wrapping around.
    fn advance(&mut self) -> usize {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.transports.len();
        index
    }

    fn cancel(&mut self) -> Done {
        #[cfg(feature = "tracing")]
        tracing::info!(component = %self.name, "stop requested, leaving reconnect loop");
        self.finish(Termination::Cancelled);
        Done::Cancelled
    }

    fn report_failure(&self, index: usize, disposition: Disposition, error: &BoxError) {
        #[cfg(feature = "metrics")]
        counter!(
            "failover_failures_total",
            "component" => self.name.clone(),
            "transport" => index.to_string(),
            "disposition" => disposition.as_str()
        )
        .increment(1);

        self.listeners.emit(&ComponentEvent::Failure {
            component: self.name.clone(),
            timestamp: Instant::now(),
            transport: index,
            disposition,
            error: error.to_string(),
        });
    }

    fn finish(&mut self, termination: Termination) {
        self.transition(EngineState::Done(termination));

        #[cfg(feature = "metrics")]
        counter!(
            "failover_terminations_total",
            "component" => self.name.clone(),
            "outcome" => termination.as_str()
        )
        .increment(1);

        self.listeners.emit(&ComponentEvent::Finished {
            component: self.name.clone(),
            timestamp: Instant::now(),
            termination,
        });
    }

    fn transition(&mut self, to: EngineState) {
        let from = std::mem::replace(&mut self.state, to);

        #[cfg(feature = "tracing")]
        tracing::trace!(component = %self.name, from = ?from, to = ?to, "engine state transition");

        self.listeners.emit(&ComponentEvent::StateTransition {
            component: self.name.clone(),
            timestamp: Instant::now(),
            from,
            to,
        });
    }
}

impl std::fmt::Debug for ReconnectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectEngine")
            .field("name", &self.name)
            .field("transports", &self.transports)
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
