//! Error types for transport configuration.

/// Errors raised while validating transport configuration.
///
/// All of these are reported at construction time; none of them is ever
/// deferred to connect time or retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The transport `type` is neither `websocket` nor `rawsocket`.
    #[error("invalid transport type '{0}'")]
    UnknownTransportType(String),

    /// The endpoint `type` is neither `tcp` nor `unix`.
    #[error("invalid endpoint type '{0}'")]
    UnknownEndpointType(String),

    /// A field required by the transport or endpoint type is absent.
    #[error("{context} configuration requires '{field}'")]
    MissingField {
        /// Where the field was expected ("websocket transport", "tcp endpoint", ...).
        context: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The websocket URL does not parse or has the wrong scheme.
    #[error("invalid websocket url '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// IP version other than 4 or 6.
    #[error("invalid IP version {0}, must be 4 or 6")]
    InvalidIpVersion(u8),

    /// TLS was requested on an IPv6 endpoint.
    #[error("TLS on IPv6 is not supported")]
    TlsOverIpv6,

    /// `max_retries` is negative but not the unbounded marker `-1`.
    #[error("invalid max_retries {0}, must be -1 (unbounded) or >= 0")]
    InvalidRetries(i64),

    /// Backoff parameters are inconsistent.
    #[error("invalid backoff: {0}")]
    InvalidBackoff(String),

    /// A component was configured without any transport.
    #[error("at least one transport must be configured")]
    NoTransports,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
