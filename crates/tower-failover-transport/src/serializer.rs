//! Serializer selection for transports.
//!
//! Codecs themselves live with the connector; this module only resolves the
//! configured ids into the ordered set the connector should offer.

use crate::config::TransportKind;
use std::fmt;

/// Serializers offered by a websocket transport when none are configured.
pub const DEFAULT_WEBSOCKET_SERIALIZERS: [&str; 2] = ["msgpack", "json"];

/// Serializer used by a rawsocket transport when none is configured.
pub const DEFAULT_RAWSOCKET_SERIALIZER: &str = "json";

/// A message serializer understood by the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Serializer {
    /// MessagePack, optionally batched.
    MsgPack {
        /// Whether several messages share one frame.
        batched: bool,
    },
    /// JSON, optionally batched.
    Json {
        /// Whether several messages share one frame.
        batched: bool,
    },
}

impl Serializer {
    /// Resolves a single serializer id such as `json` or `msgpack.batched`.
    pub fn from_id(id: &str) -> Result<Self, UnknownSerializer> {
        match id {
            "msgpack" => Ok(Serializer::MsgPack { batched: false }),
            "msgpack.batched" => Ok(Serializer::MsgPack { batched: true }),
            "json" => Ok(Serializer::Json { batched: false }),
            "json.batched" => Ok(Serializer::Json { batched: true }),
            other => Err(UnknownSerializer(other.to_string())),
        }
    }

    /// The id of this serializer.
    pub fn id(&self) -> &'static str {
        match self {
            Serializer::MsgPack { batched: false } => "msgpack",
            Serializer::MsgPack { batched: true } => "msgpack.batched",
            Serializer::Json { batched: false } => "json",
            Serializer::Json { batched: true } => "json.batched",
        }
    }
}

impl fmt::Display for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A serializer id that no codec is registered for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown serializer '{0}'")]
pub struct UnknownSerializer(pub String);

/// Ordered set of serializers, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerSet {
    serializers: Vec<Serializer>,
}

impl SerializerSet {
    /// Builds the set a websocket transport offers for a list of family ids.
    ///
    /// Each of `msgpack` and `json` expands into its batched and unbatched
    /// variants, batched first. Duplicate ids are ignored, keeping the first
    /// occurrence.
    pub fn negotiable<I, S>(ids: I) -> Result<Self, UnknownSerializer>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: Vec<String> = Vec::new();
        let mut serializers = Vec::new();

        for id in ids {
            let id = id.as_ref();
            if seen.iter().any(|s| s == id) {
                continue;
            }
            seen.push(id.to_string());

            match id {
                "msgpack" => serializers.extend([
                    Serializer::MsgPack { batched: true },
                    Serializer::MsgPack { batched: false },
                ]),
                "json" => serializers.extend([
                    Serializer::Json { batched: true },
                    Serializer::Json { batched: false },
                ]),
                other => return Err(UnknownSerializer(other.to_string())),
            }
        }

        Ok(Self { serializers })
    }

    /// Builds a set holding exactly one serializer, as a rawsocket transport uses.
    pub fn single(id: &str) -> Result<Self, UnknownSerializer> {
        Ok(Self {
            serializers: vec![Serializer::from_id(id)?],
        })
    }

    /// Resolves the serializers configured on a transport.
    pub fn for_transport(kind: &TransportKind) -> Result<Self, UnknownSerializer> {
        match kind {
            TransportKind::WebSocket { serializers, .. } => Self::negotiable(serializers),
            TransportKind::RawSocket { serializer } => Self::single(serializer),
        }
    }

    /// Most preferred serializer, if any.
    pub fn preferred(&self) -> Option<Serializer> {
        self.serializers.first().copied()
    }

    /// Iterates in preference order.
    pub fn iter(&self) -> impl Iterator<Item = &Serializer> {
        self.serializers.iter()
    }

    /// Number of serializers in the set.
    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }
}
