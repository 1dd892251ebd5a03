use crate::classifier::Disposition;
use crate::state::{EngineState, Termination};
use std::time::{Duration, Instant};
use tower_failover_core::LifecycleEvent;

/// Events emitted by a component while it connects and reconnects.
#[derive(Debug, Clone)]
pub enum ComponentEvent {
    /// The component started and is about to enter its reconnect loop.
    Started {
        component: String,
        timestamp: Instant,
        transports: usize,
    },
    /// The engine moved between lifecycle states.
    StateTransition {
        component: String,
        timestamp: Instant,
        from: EngineState,
        to: EngineState,
    },
    /// An attempt on a transport is about to wait `delay` and connect.
    Attempt {
        component: String,
        timestamp: Instant,
        transport: usize,
        attempt: u32,
        delay: Duration,
    },
    /// An attempt failed.
    Failure {
        component: String,
        timestamp: Instant,
        transport: usize,
        disposition: Disposition,
        error: String,
    },
    /// A transport was disqualified for good.
    Disqualified {
        component: String,
        timestamp: Instant,
        transport: usize,
    },
    /// The engine reached a terminal state.
    Finished {
        component: String,
        timestamp: Instant,
        termination: Termination,
    },
}

impl LifecycleEvent for ComponentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ComponentEvent::Started { .. } => "started",
            ComponentEvent::StateTransition { .. } => "state_transition",
            ComponentEvent::Attempt { .. } => "attempt",
            ComponentEvent::Failure { .. } => "failure",
            ComponentEvent::Disqualified { .. } => "disqualified",
            ComponentEvent::Finished { .. } => "finished",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ComponentEvent::Started { timestamp, .. }
            | ComponentEvent::StateTransition { timestamp, .. }
            | ComponentEvent::Attempt { timestamp, .. }
            | ComponentEvent::Failure { timestamp, .. }
            | ComponentEvent::Disqualified { timestamp, .. }
            | ComponentEvent::Finished { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            ComponentEvent::Started { component, .. }
            | ComponentEvent::StateTransition { component, .. }
            | ComponentEvent::Attempt { component, .. }
            | ComponentEvent::Failure { component, .. }
            | ComponentEvent::Disqualified { component, .. }
            | ComponentEvent::Finished { component, .. } => component,
        }
    }
}
