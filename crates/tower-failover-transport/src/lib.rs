//! Transport descriptors and configuration for tower-failover.
//!
//! This crate describes *what* a component may connect through and *how
//! patiently*:
//!
//! - [`TransportConfig`]: a validated websocket or rawsocket transport over a
//!   TCP or unix endpoint, with its retry budget and backoff policy
//! - [`TransportSpec`]: the raw, configuration-file shape it is validated from
//! - [`BackoffPolicy`]: per-transport delay between attempts
//! - [`Transport`]: the mutable descriptor a reconnection engine owns
//! - [`SerializerSet`]: serializer ids resolved for the connector
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use tower_failover_transport::{BackoffPolicy, Endpoint, Transport, TransportConfig};
//!
//! let config = TransportConfig::rawsocket(Endpoint::tcp("localhost", 8080))?
//!     .max_retries(5)
//!     .backoff(BackoffPolicy::exponential(
//!         Duration::from_millis(500),
//!         Duration::from_secs(30),
//!     ))?;
//!
//! let mut transport = Transport::new(0, config);
//! assert!(transport.can_retry());
//!
//! transport.record_attempt();
//! assert_eq!(transport.next_delay(), Duration::ZERO);
//! # Ok::<(), tower_failover_transport::ConfigError>(())
//! ```
//!
//! # Feature flags
//!
//! - `serde`: derives `Deserialize` for [`TransportSpec`], [`EndpointSpec`] and [`TlsSpec`]

mod backoff;
mod config;
mod descriptor;
mod error;
mod serializer;
mod tls;

pub use backoff::{
    BackoffPolicy, BackoffReset, BackoffStrategy, ExponentialBackoff, FixedInterval, FnInterval,
    IntervalFunction, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MULTIPLIER,
};
pub use config::{
    Endpoint, EndpointSpec, IpVersion, TlsSpec, TransportConfig, TransportKind, TransportSpec,
    DEFAULT_CONNECT_TIMEOUT,
};
pub use descriptor::Transport;
pub use error::{ConfigError, Result};
pub use serializer::{
    Serializer, SerializerSet, UnknownSerializer, DEFAULT_RAWSOCKET_SERIALIZER,
    DEFAULT_WEBSOCKET_SERIALIZERS,
};
pub use tls::{TlsConfig, TlsContext};
