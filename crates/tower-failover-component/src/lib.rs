//! Reconnection and supervision for clients with alternative transports.
//!
//! A [`Component`] owns an ordered list of transports and a connector (any
//! `tower::Service<ConnectRequest, Response = SessionEnd>`). Starting it runs
//! a [`ReconnectEngine`] that tries the transports round-robin, each with its
//! own retry budget and backoff, until a session completes, a terminal error
//! occurs, every transport is used up, or a stop is requested.
//!
//! # Features
//!
//! - **Round-robin failover**: transports are tried in configured order, skipping
//!   disqualified and exhausted ones
//! - **Per-transport backoff**: see [`BackoffPolicy`](tower_failover_transport::BackoffPolicy)
//! - **Error classification**: [`ErrorClassifier`] decides between giving up,
//!   dropping one transport, or retrying
//! - **Explicit run loop and stop signal**: [`RunLoop`], [`stop_signal`]
//! - **Supervision**: [`supervise`] and [`run`] drive many components at once
//! - **Event system**: observe attempts, failures and terminations
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use tower::service_fn;
//! use tower_failover_component::{run, Component, ConnectRequest, SessionEnd};
//! use tower_failover_transport::{BackoffPolicy, Endpoint, TransportConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = service_fn(|req: ConnectRequest| async move {
//!     // dial `req.config`, negotiate one of `req.serializers`, run the session
//!     let _ = req;
//!     Ok::<_, std::io::Error>(SessionEnd::Completed)
//! });
//!
//! let component = Component::builder(connector)
//!     .name("backend")
//!     .transport(
//!         TransportConfig::rawsocket(Endpoint::tcp("127.0.0.1", 8080))?
//!             .max_retries(3)
//!             .backoff(BackoffPolicy::exponential(
//!                 Duration::from_millis(100),
//!                 Duration::from_secs(2),
//!             ))?,
//!     )
//!     .on_attempt(|transport, attempt, delay| {
//!         println!("transport {} attempt {} after {:?}", transport, attempt, delay);
//!     })
//!     .build()?;
//!
//! let report = run(component)?;
//! assert!(report.all_succeeded());
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! - `tracing` (default): structured logs for attempts, failures and terminations
//! - `metrics`: attempt, failure and termination counters

mod attempt;
mod classifier;
mod component;
mod engine;
mod error;
mod events;
mod run_loop;
mod state;
mod stop;
mod supervisor;

pub use attempt::{connect_once, AttemptOutcome, BoxConnector, ConnectRequest, SessionEnd};
pub use classifier::{
    find_cause, ApplicationError, DefaultClassifier, Disposition, ErrorClassifier, FnClassifier,
    TlsError, TlsFailure, NO_SUCH_REALM,
};
pub use component::{Component, ComponentBuilder};
pub use engine::ReconnectEngine;
pub use error::{ComponentError, Done};
pub use events::ComponentEvent;
pub use run_loop::RunLoop;
pub use state::{EngineState, Termination};
pub use stop::{stop_signal, StopHandle, StopSignal};
pub use supervisor::{run, supervise, ComponentReport, ComponentSet, SupervisorReport};

pub use tokio_util::sync::CancellationToken;
pub use tower_failover_core::BoxError;
