//! A single connect-and-run cycle on one transport.

use crate::classifier::{Disposition, ErrorClassifier};
use std::fmt;
use std::sync::Arc;
use tower::util::BoxService;
use tower::{Service, ServiceExt};
use tower_failover_core::BoxError;
use tower_failover_transport::{SerializerSet, Transport, TransportConfig};

/// Type-erased connector: dials a transport, binds a session to it and
/// resolves once that session is over.
pub type BoxConnector = BoxService<ConnectRequest, SessionEnd, BoxError>;

/// Everything a connector needs to dial one transport.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Position of the transport in the component's list.
    pub transport: usize,
    /// Validated transport configuration.
    pub config: Arc<TransportConfig>,
    /// Serializers to offer, most preferred first.
    pub serializers: SerializerSet,
}

/// How a session that connected successfully came to an end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The session's main work finished.
    Completed,
    /// The session left the realm on purpose.
    Left {
        /// Reason URI or text given on leave.
        reason: String,
    },
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Completed => f.write_str("completed"),
            SessionEnd::Left { reason } => write!(f, "left ({})", reason),
        }
    }
}

/// Classified result of one connection attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The session ran and ended cleanly.
    Success(SessionEnd),
    /// Worth trying again later.
    Retryable(BoxError),
    /// This transport is unusable.
    TransportLocal(BoxError),
    /// Nothing will ever work.
    Fatal(BoxError),
    /// Unrecognized failure.
    Unclassified(BoxError),
}

impl AttemptOutcome {
    /// Classifies the raw result of a connector call.
    pub fn from_result(
        result: Result<SessionEnd, BoxError>,
        classifier: &dyn ErrorClassifier,
    ) -> Self {
        match result {
            Ok(end) => AttemptOutcome::Success(end),
            Err(error) => match classifier.classify(&*error) {
                Disposition::Fatal => AttemptOutcome::Fatal(error),
                Disposition::TransportLocal => AttemptOutcome::TransportLocal(error),
                Disposition::Retryable => AttemptOutcome::Retryable(error),
                Disposition::Unclassified => AttemptOutcome::Unclassified(error),
            },
        }
    }

    /// The disposition of a failed attempt; `None` on success.
    pub fn disposition(&self) -> Option<Disposition> {
        match self {
            AttemptOutcome::Success(_) => None,
            AttemptOutcome::Retryable(_) => Some(Disposition::Retryable),
            AttemptOutcome::TransportLocal(_) => Some(Disposition::TransportLocal),
            AttemptOutcome::Fatal(_) => Some(Disposition::Fatal),
            AttemptOutcome::Unclassified(_) => Some(Disposition::Unclassified),
        }
    }

    /// Returns true for [`AttemptOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success(_))
    }
}

/// Runs one attempt on `transport` and classifies how it ended.
///
/// Never retries. Serializers that cannot be resolved are reported as
/// [`AttemptOutcome::Unclassified`] without calling the connector, and a
/// connector that fails to become ready is treated like a failed call.
pub async fn connect_once<S>(
    connector: &mut S,
    transport: &Transport,
    classifier: &dyn ErrorClassifier,
) -> AttemptOutcome
where
    S: Service<ConnectRequest, Response = SessionEnd, Error = BoxError>,
{
    let serializers = match SerializerSet::for_transport(transport.config().kind()) {
        Ok(serializers) => serializers,
        Err(unknown) => return AttemptOutcome::Unclassified(Box::new(unknown)),
    };

    let request = ConnectRequest {
        transport: transport.index(),
        config: Arc::clone(transport.config()),
        serializers,
    };

    let result = match connector.ready().await {
        Ok(ready) => ready.call(request).await,
        Err(error) => Err(error),
    };

    AttemptOutcome::from_result(result, classifier)
}
