//! Transport configuration.
//!
//! [`TransportSpec`] mirrors the loose, file-friendly shape of a transport
//! entry (string type tags, optional fields, seconds as floats). Converting it
//! into a [`TransportConfig`] validates and normalizes everything up front so
//! that nothing configuration-related can fail once connecting starts.

use crate::backoff::{BackoffPolicy, BackoffStrategy, ExponentialBackoff};
use crate::error::{ConfigError, Result};
use crate::serializer::{DEFAULT_RAWSOCKET_SERIALIZER, DEFAULT_WEBSOCKET_SERIALIZERS};
use crate::tls::TlsConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default connect timeout for endpoints.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw transport entry as found in configuration files.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportSpec {
    /// `"websocket"` or `"rawsocket"`.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// WebSocket URL, required for websocket transports.
    pub url: Option<String>,
    /// Endpoint to dial. Websocket transports derive it from `url` when absent.
    pub endpoint: Option<EndpointSpec>,
    /// Serializer families offered by a websocket transport.
    pub serializers: Option<Vec<String>>,
    /// Serializer used by a rawsocket transport.
    pub serializer: Option<String>,
    /// Failed attempts tolerated; absent or `-1` means unbounded.
    pub max_retries: Option<i64>,
    /// Seconds before the first retry.
    pub initial_retry_delay: Option<f64>,
    /// Ceiling in seconds.
    pub max_retry_delay: Option<f64>,
    /// Growth factor between retries.
    pub retry_delay_growth: Option<f64>,
    /// Randomization factor in `[0, 1]`.
    pub retry_delay_jitter: Option<f64>,
}

/// Raw endpoint entry.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EndpointSpec {
    /// `"tcp"` or `"unix"`.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// Host name or address (tcp).
    pub host: Option<String>,
    /// Port (tcp).
    pub port: Option<u16>,
    /// Socket path (unix).
    pub path: Option<String>,
    /// IP version, 4 or 6 (tcp, default 4).
    pub version: Option<u8>,
    /// Connect timeout in seconds (default 10).
    pub timeout: Option<f64>,
    /// TLS settings (tcp).
    pub tls: Option<TlsSpec>,
}

/// Raw TLS setting: a flag or a table of connector options.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum TlsSpec {
    /// `true` enables TLS with default settings, `false` disables it.
    Enabled(bool),
    /// Enables TLS, passing the options through to the connector.
    Options(BTreeMap<String, String>),
}

/// IP version for TCP endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpVersion {
    /// IPv4.
    #[default]
    V4,
    /// IPv6.
    V6,
}

impl TryFrom<u8> for IpVersion {
    type Error = ConfigError;

    fn try_from(version: u8) -> Result<Self> {
        match version {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            other => Err(ConfigError::InvalidIpVersion(other)),
        }
    }
}

/// A validated endpoint.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// TCP, optionally with TLS.
    Tcp {
        /// Host name or address.
        host: String,
        /// Port.
        port: u16,
        /// IP version.
        version: IpVersion,
        /// Connect timeout.
        timeout: Duration,
        /// TLS settings.
        tls: TlsConfig,
    },
    /// Unix domain socket.
    Unix {
        /// Socket path.
        path: PathBuf,
        /// Connect timeout.
        timeout: Duration,
    },
}

impl Endpoint {
    /// Plain TCP over IPv4 with the default timeout.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port,
            version: IpVersion::V4,
            timeout: DEFAULT_CONNECT_TIMEOUT,
            tls: TlsConfig::Disabled,
        }
    }

    /// Unix socket with the default timeout.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Endpoint::Unix {
            path: path.into(),
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets TLS on a TCP endpoint; no effect on unix endpoints.
    pub fn with_tls(mut self, tls_config: TlsConfig) -> Self {
        if let Endpoint::Tcp { tls, .. } = &mut self {
            *tls = tls_config;
        }
        self
    }

    /// Sets the IP version on a TCP endpoint; no effect on unix endpoints.
    pub fn with_version(mut self, ip_version: IpVersion) -> Self {
        if let Endpoint::Tcp { version, .. } = &mut self {
            *version = ip_version;
        }
        self
    }

    /// Sets the connect timeout.
    pub fn with_timeout(mut self, connect_timeout: Duration) -> Self {
        match &mut self {
            Endpoint::Tcp { timeout, .. } | Endpoint::Unix { timeout, .. } => {
                *timeout = connect_timeout
            }
        }
        self
    }

    /// Connect timeout.
    pub fn timeout(&self) -> Duration {
        match self {
            Endpoint::Tcp { timeout, .. } | Endpoint::Unix { timeout, .. } => *timeout,
        }
    }

    /// Rejects combinations no connector can dial.
    pub fn validate(&self) -> Result<()> {
        if let Endpoint::Tcp {
            version: IpVersion::V6,
            tls,
            ..
        } = self
        {
            if tls.is_enabled() {
                return Err(ConfigError::TlsOverIpv6);
            }
        }
        Ok(())
    }
}

impl TryFrom<EndpointSpec> for Endpoint {
    type Error = ConfigError;

    fn try_from(spec: EndpointSpec) -> Result<Self> {
        let timeout = match spec.timeout {
            Some(secs) => seconds("endpoint timeout", secs)?,
            None => DEFAULT_CONNECT_TIMEOUT,
        };

        let endpoint = match spec.kind.as_str() {
            "tcp" => {
                let host = spec.host.ok_or(ConfigError::MissingField {
                    context: "tcp endpoint",
                    field: "host",
                })?;
                let port = spec.port.ok_or(ConfigError::MissingField {
                    context: "tcp endpoint",
                    field: "port",
                })?;
                let tls = match spec.tls {
                    None | Some(TlsSpec::Enabled(false)) => TlsConfig::Disabled,
                    Some(TlsSpec::Enabled(true)) => TlsConfig::default_for_host(),
                    Some(TlsSpec::Options(options)) => TlsConfig::DefaultForHost { options },
                };
                Endpoint::Tcp {
                    host,
                    port,
                    version: IpVersion::try_from(spec.version.unwrap_or(4))?,
                    timeout,
                    tls,
                }
            }
            "unix" => {
                let path = spec.path.ok_or(ConfigError::MissingField {
                    context: "unix endpoint",
                    field: "path",
                })?;
                Endpoint::Unix {
                    path: PathBuf::from(path),
                    timeout,
                }
            }
            other => return Err(ConfigError::UnknownEndpointType(other.to_string())),
        };

        endpoint.validate()?;
        Ok(endpoint)
    }
}

/// Wire framing of a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// WAMP over WebSocket.
    WebSocket {
        /// WebSocket URL.
        url: String,
        /// Serializer families offered during the handshake.
        serializers: Vec<String>,
    },
    /// WAMP over RawSocket.
    RawSocket {
        /// The one serializer used on the connection.
        serializer: String,
    },
}

impl TransportKind {
    /// `"websocket"` or `"rawsocket"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::WebSocket { .. } => "websocket",
            TransportKind::RawSocket { .. } => "rawsocket",
        }
    }
}

/// A validated transport: how to dial, how to frame, and how hard to retry.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    kind: TransportKind,
    endpoint: Endpoint,
    max_retries: Option<u32>,
    backoff: BackoffPolicy,
}

impl TransportConfig {
    /// WebSocket transport dialing the host and port of `url`.
    ///
    /// `wss` URLs get TLS with default settings.
    pub fn websocket(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let endpoint = endpoint_from_url(&url)?;
        Self::websocket_via(url, endpoint)
    }

    /// WebSocket transport with an explicit endpoint.
    pub fn websocket_via(url: impl Into<String>, endpoint: Endpoint) -> Result<Self> {
        let url = url.into();
        parse_websocket_url(&url)?;
        endpoint.validate()?;
        Ok(Self::new(
            TransportKind::WebSocket {
                url,
                serializers: DEFAULT_WEBSOCKET_SERIALIZERS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            endpoint,
        ))
    }

    /// RawSocket transport with the default JSON serializer.
    pub fn rawsocket(endpoint: Endpoint) -> Result<Self> {
        endpoint.validate()?;
        Ok(Self::new(
            TransportKind::RawSocket {
                serializer: DEFAULT_RAWSOCKET_SERIALIZER.to_string(),
            },
            endpoint,
        ))
    }

    fn new(kind: TransportKind, endpoint: Endpoint) -> Self {
        Self {
            kind,
            endpoint,
            max_retries: None,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Replaces the serializers offered by a websocket transport, or the
    /// serializer of a rawsocket transport (first id wins).
    ///
    /// Ids are resolved per connection attempt.
    pub fn serializers<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        match &mut self.kind {
            TransportKind::WebSocket { serializers, .. } => *serializers = ids,
            TransportKind::RawSocket { serializer } => {
                if let Some(first) = ids.into_iter().next() {
                    *serializer = first;
                }
            }
        }
        self
    }

    /// Failed attempts tolerated before the transport is exhausted.
    ///
    /// A budget of 0 means the transport is never attempted.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Retries this transport without limit. This is the default.
    pub fn unlimited_retries(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Sets the backoff policy.
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Result<Self> {
        backoff.validate()?;
        self.backoff = backoff;
        Ok(self)
    }

    /// Framing of this transport.
    pub fn kind(&self) -> &TransportKind {
        &self.kind
    }

    /// Endpoint to dial.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Retry budget; `None` means unbounded.
    pub fn retry_budget(&self) -> Option<u32> {
        self.max_retries
    }

    /// Backoff policy.
    pub fn backoff_policy(&self) -> &BackoffPolicy {
        &self.backoff
    }
}

impl TryFrom<TransportSpec> for TransportConfig {
    type Error = ConfigError;

    fn try_from(spec: TransportSpec) -> Result<Self> {
        let mut config = match spec.kind.as_str() {
            "websocket" => {
                let url = spec.url.ok_or(ConfigError::MissingField {
                    context: "websocket transport",
                    field: "url",
                })?;
                let config = match spec.endpoint {
                    Some(endpoint) => Self::websocket_via(url, Endpoint::try_from(endpoint)?)?,
                    None => Self::websocket(url)?,
                };
                match spec.serializers {
                    Some(ids) => config.serializers(ids),
                    None => config,
                }
            }
            "rawsocket" => {
                let endpoint = spec.endpoint.ok_or(ConfigError::MissingField {
                    context: "rawsocket transport",
                    field: "endpoint",
                })?;
                let config = Self::rawsocket(Endpoint::try_from(endpoint)?)?;
                match spec.serializer {
                    Some(id) => config.serializers([id]),
                    None => config,
                }
            }
            other => return Err(ConfigError::UnknownTransportType(other.to_string())),
        };

        config.max_retries = match spec.max_retries {
            None | Some(-1) => None,
            Some(n) => Some(u32::try_from(n).map_err(|_| ConfigError::InvalidRetries(n))?),
        };

        let initial = match spec.initial_retry_delay {
            Some(secs) => seconds("initial_retry_delay", secs)?,
            None => crate::backoff::DEFAULT_INITIAL_DELAY,
        };
        let mut backoff = ExponentialBackoff::new(initial);
        if let Some(secs) = spec.max_retry_delay {
            backoff = backoff.max_interval(seconds("max_retry_delay", secs)?);
        }
        if let Some(growth) = spec.retry_delay_growth {
            backoff = backoff.multiplier(growth);
        }
        if let Some(jitter) = spec.retry_delay_jitter {
            backoff = backoff.jitter(jitter);
        }

        config.backoff(BackoffPolicy::from_strategy(BackoffStrategy::Exponential(
            backoff,
        )))
    }
}

fn seconds(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::InvalidBackoff(format!("{} must be >= 0 seconds, got {}", field, secs)))
}

fn parse_websocket_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("scheme must be ws or wss, got {}", other),
        }),
    }
}

fn endpoint_from_url(raw: &str) -> Result<Endpoint> {
    let parsed = parse_websocket_url(raw)?;
    let port = parsed.port_or_known_default().ok_or_else(|| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: "missing port".to_string(),
    })?;

    let endpoint = match parsed.host() {
        Some(url::Host::Domain(domain)) => Endpoint::tcp(domain, port),
        Some(url::Host::Ipv4(addr)) => Endpoint::tcp(addr.to_string(), port),
        Some(url::Host::Ipv6(addr)) => {
            Endpoint::tcp(addr.to_string(), port).with_version(IpVersion::V6)
        }
        None => {
            return Err(ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: "missing host".to_string(),
            })
        }
    };
    Ok(if parsed.scheme() == "wss" {
        endpoint.with_tls(TlsConfig::default_for_host())
    } else {
        endpoint
    })
}
