//! TLS settings for TCP endpoints.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// An opaque, pre-built TLS client context.
///
/// The transport layer never looks inside; connectors downcast it back to
/// whatever concrete type they were handed (a rustls `ClientConfig`, an
/// OpenSSL connector, ...).
#[derive(Clone)]
pub struct TlsContext(Arc<dyn Any + Send + Sync>);

impl TlsContext {
    /// Wraps a connector-specific context.
    pub fn new<T>(context: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Arc::new(context))
    }

    /// Returns the context if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TlsContext(..)")
    }
}

/// How a TCP endpoint secures its connection.
#[derive(Debug, Clone, Default)]
pub enum TlsConfig {
    /// Plain TCP.
    #[default]
    Disabled,

    /// TLS with the connector's default client settings for the endpoint host.
    ///
    /// Free-form options from the configuration file are passed through
    /// untouched for the connector to interpret.
    DefaultForHost {
        /// Connector-specific options, possibly empty.
        options: BTreeMap<String, String>,
    },

    /// TLS with a context built by the caller.
    Provided(TlsContext),
}

impl TlsConfig {
    /// TLS with default settings and no extra options.
    pub fn default_for_host() -> Self {
        TlsConfig::DefaultForHost {
            options: BTreeMap::new(),
        }
    }

    /// TLS with a caller-built context.
    pub fn provided<T>(context: T) -> Self
    where
        T: Any + Send + Sync,
    {
        TlsConfig::Provided(TlsContext::new(context))
    }

    /// Returns true unless TLS is disabled.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, TlsConfig::Disabled)
    }
}
