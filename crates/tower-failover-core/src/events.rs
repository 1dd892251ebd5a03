//! Event system for connection lifecycles.
//!
//! Components and supervisors emit events through [`EventListeners`] so callers
//! can observe attempts, disqualified transports and terminal states without
//! hooking into the retry loop itself.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted while a component connects and reconnects.
pub trait LifecycleEvent: Send + Sync + fmt::Debug {
    /// Returns the type of event (e.g., "attempt", "state_transition").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the component that emitted this event.
    fn component_name(&self) -> &str;
}

/// Trait for listening to lifecycle events.
pub trait EventListener<E: LifecycleEvent>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &E);
}

/// Type alias for shared event listeners.
pub type SharedEventListener<E> = Arc<dyn EventListener<E>>;

/// An ordered collection of event listeners.
///
/// Listeners are invoked in registration order.
pub struct EventListeners<E: LifecycleEvent> {
    listeners: Vec<SharedEventListener<E>>,
}

impl<E: LifecycleEvent> EventListeners<E> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers an event to every listener.
    ///
    /// A panicking listener is isolated: the panic is caught and the remaining
    /// listeners still receive the event.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let delivered = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            #[cfg(feature = "tracing")]
            if delivered.is_err() {
                tracing::warn!(
                    component = event.component_name(),
                    event = event.event_type(),
                    "event listener panicked"
                );
            }
            #[cfg(not(feature = "tracing"))]
            let _ = delivered;
        }
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: LifecycleEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E: LifecycleEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LifecycleEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// A listener backed by a closure.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps a closure as a listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: LifecycleEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
