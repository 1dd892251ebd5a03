//! Components and their builder.

use crate::attempt::{BoxConnector, ConnectRequest, SessionEnd};
use crate::classifier::{DefaultClassifier, Disposition, ErrorClassifier};
use crate::engine::ReconnectEngine;
use crate::error::{ComponentError, Done};
use crate::events::ComponentEvent;
use crate::run_loop::RunLoop;
use crate::state::{EngineState, Termination};
use crate::stop::StopSignal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tower::util::BoxService;
use tower::{Service, ServiceExt};
use tower_failover_core::{BoxError, EventListener, EventListeners, FnListener};
use tower_failover_transport::{ConfigError, Transport, TransportConfig, TransportSpec};

/// One logical client: an ordered list of transports, a connector that turns
/// a transport into a running session, and the policy for reacting to
/// failures.
///
/// Built with [`Component::builder`] and consumed by [`Component::start`] or
/// the [`supervise`](crate::supervise) / [`run`](crate::run) entry points.
pub struct Component {
    name: String,
    transports: Vec<Transport>,
    connector: BoxConnector,
    classifier: Arc<dyn ErrorClassifier>,
    listeners: EventListeners<ComponentEvent>,
    stop: StopSignal,
}

impl Component {
    /// Starts building a component around `connector`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tower::service_fn;
    /// use tower_failover_component::{Component, ConnectRequest, SessionEnd};
    /// use tower_failover_transport::{Endpoint, TransportConfig};
    ///
    /// let component = Component::builder(service_fn(|_req: ConnectRequest| async {
    ///     Ok::<_, std::io::Error>(SessionEnd::Completed)
    /// }))
    /// .name("backend")
    /// .transport(TransportConfig::websocket("ws://127.0.0.1:8080/ws")?)
    /// .transport(TransportConfig::rawsocket(Endpoint::unix("/tmp/router.sock"))?)
    /// .build()?;
    ///
    /// assert_eq!(component.transports().len(), 2);
    /// # Ok::<(), tower_failover_transport::ConfigError>(())
    /// ```
    pub fn builder<S>(connector: S) -> ComponentBuilder
    where
        S: Service<ConnectRequest, Response = SessionEnd> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
    {
        ComponentBuilder::new(BoxService::new(connector.map_err(Into::<BoxError>::into)))
    }

    /// Component name, used in logs, events and reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transport descriptors in configured order.
    pub fn transports(&self) -> &[Transport] {
        &self.transports
    }

    /// Runs the component until it terminates.
    ///
    /// Each call consumes the component, so a component starts at most once.
    /// Backoff waits are scheduled on `run_loop`.
    pub async fn start<R>(self, run_loop: &R) -> Result<Done, ComponentError>
    where
        R: RunLoop + ?Sized,
    {
        #[cfg(feature = "tracing")]
        tracing::debug!(component = %self.name, "starting component");

        self.into_engine().run(run_loop).await
    }

    /// Creates the engine without running it.
    pub fn into_engine(self) -> ReconnectEngine {
        ReconnectEngine::new(
            self.name,
            self.transports,
            self.connector,
            self.classifier,
            self.listeners,
            self.stop,
        )
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("transports", &self.transports)
            .field("listeners", &self.listeners)
            .field("stop", &self.stop)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Component`].
pub struct ComponentBuilder {
    name: String,
    transports: Vec<TransportConfig>,
    invalid: Option<ConfigError>,
    connector: BoxConnector,
    classifier: Arc<dyn ErrorClassifier>,
    listeners: EventListeners<ComponentEvent>,
    stop: StopSignal,
}

impl ComponentBuilder {
    fn new(connector: BoxConnector) -> Self {
        Self {
            name: String::from("<unnamed>"),
            transports: Vec::new(),
            invalid: None,
            connector,
            classifier: Arc::new(DefaultClassifier::new()),
            listeners: EventListeners::new(),
            stop: StopSignal::never(),
        }
    }

    /// Sets the component name. Default `"<unnamed>"`.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Appends a transport. Transports are tried in the order they are added.
    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.transports.push(transport);
        self
    }

    /// Appends several transports.
    pub fn transports<I>(mut self, transports: I) -> Self
    where
        I: IntoIterator<Item = TransportConfig>,
    {
        self.transports.extend(transports);
        self
    }

    /// Appends a transport in its raw configuration form.
    ///
    /// Validation errors are reported by [`build`](Self::build).
    pub fn transport_spec(mut self, spec: TransportSpec) -> Self {
        match TransportConfig::try_from(spec) {
            Ok(transport) => self.transports.push(transport),
            Err(error) => {
                self.invalid.get_or_insert(error);
            }
        }
        self
    }

    /// Replaces the [`DefaultClassifier`].
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: ErrorClassifier + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Lets a [`StopHandle`](crate::StopHandle) end this component.
    pub fn stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Called once when the component starts, with its transport count.
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let ComponentEvent::Started { transports, .. } = event {
                f(*transports);
            }
        }));
        self
    }

    /// Called before each attempt with the transport index, the attempt
    /// number on that transport and the delay about to be waited.
    pub fn on_attempt<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, u32, Duration) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let ComponentEvent::Attempt {
                transport,
                attempt,
                delay,
                ..
            } = event
            {
                f(*transport, *attempt, *delay);
            }
        }));
        self
    }

    /// Called after each failed attempt with the transport index and how the
    /// failure was classified.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Disposition) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let ComponentEvent::Failure {
                transport,
                disposition,
                ..
            } = event
            {
                f(*transport, *disposition);
            }
        }));
        self
    }

    /// Called when a transport is disqualified for good.
    pub fn on_disqualified<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let ComponentEvent::Disqualified { transport, .. } = event {
                f(*transport);
            }
        }));
        self
    }

    /// Called on every engine state transition.
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(EngineState, EngineState) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let ComponentEvent::StateTransition { from, to, .. } = event {
                f(*from, *to);
            }
        }));
        self
    }

    /// Called once when the component terminates.
    pub fn on_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(Termination) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let ComponentEvent::Finished { termination, .. } = event {
                f(*termination);
            }
        }));
        self
    }

    /// Registers a listener for every [`ComponentEvent`].
    pub fn event_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<ComponentEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Validates the configuration and builds the component.
    ///
    /// Fails with the first invalid transport spec, or
    /// [`ConfigError::NoTransports`] when no transport was given.
    pub fn build(self) -> Result<Component, ConfigError> {
        if let Some(error) = self.invalid {
            return Err(error);
        }
        if self.transports.is_empty() {
            return Err(ConfigError::NoTransports);
        }

        let transports = self
            .transports
            .into_iter()
            .enumerate()
            .map(|(index, config)| Transport::new(index, config))
            .collect();

        Ok(Component {
            name: self.name,
            transports,
            connector: self.connector,
            classifier: self.classifier,
            listeners: self.listeners,
            stop: self.stop,
        })
    }
}

impl fmt::Debug for ComponentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBuilder")
            .field("name", &self.name)
            .field("transports", &self.transports.len())
            .finish_non_exhaustive()
    }
}
