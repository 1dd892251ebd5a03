//! Failure classification for reconnection decisions.
//!
//! An [`ErrorClassifier`] looks at the error a connection attempt raised and
//! tells the engine what to do about it through a [`Disposition`].

use std::collections::HashSet;
use std::error::Error;
use std::fmt;

/// URI a router uses to refuse an unknown realm.
pub const NO_SUCH_REALM: &str = "wamp.error.no_such_realm";

/// What the engine does with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// The remote side rejected us in a way no transport or retry can fix.
    /// The engine stops and returns the error.
    Fatal,
    /// The failure belongs to this transport's security or negotiation layer.
    /// The transport is disqualified and the engine moves on.
    TransportLocal,
    /// The attempt failed but may succeed later. The transport's budget is
    /// charged and the engine moves on.
    Retryable,
    /// Anything not recognized. The engine stops and returns the error.
    Unclassified,
}

impl Disposition {
    /// Whether this disposition ends the engine.
    pub fn is_terminal(self) -> bool {
        matches!(self, Disposition::Fatal | Disposition::Unclassified)
    }

    /// Short label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Fatal => "fatal",
            Disposition::TransportLocal => "transport_local",
            Disposition::Retryable => "retryable",
            Disposition::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An application-level error returned by the remote peer, identified by URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{uri}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct ApplicationError {
    /// Error URI, e.g. `wamp.error.no_such_realm`.
    pub uri: String,
    /// Optional human-readable detail.
    pub message: Option<String>,
}

impl ApplicationError {
    /// Creates an error with no detail message.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            message: None,
        }
    }

    /// Attaches a detail message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// One entry of a TLS library's error queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFailure {
    /// Library that reported the failure.
    pub library: String,
    /// Function that failed.
    pub function: String,
    /// Reason string.
    pub reason: String,
}

/// A secure-channel handshake failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("TLS handshake failed: {}", .failures.iter().map(|f| f.reason.as_str()).collect::<Vec<_>>().join("; "))]
pub struct TlsError {
    /// Reported failures, in queue order.
    pub failures: Vec<TlsFailure>,
}

impl TlsError {
    /// A handshake failure with a single reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            failures: vec![TlsFailure {
                library: String::new(),
                function: String::new(),
                reason: reason.into(),
            }],
        }
    }
}

/// Finds the first error of type `T` in `error`'s source chain, starting
/// with `error` itself.
pub fn find_cause<'a, T>(error: &'a (dyn Error + 'static)) -> Option<&'a T>
where
    T: Error + 'static,
{
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(found) = err.downcast_ref::<T>() {
            return Some(found);
        }
        current = err.source();
    }
    None
}

/// Decides the [`Disposition`] of a failed attempt.
pub trait ErrorClassifier: Send + Sync {
    /// Classifies the error raised by a connection attempt.
    fn classify(&self, error: &(dyn Error + 'static)) -> Disposition;
}

/// Classifier covering the failures a WAMP client can recognize.
///
/// Walking the error's source chain:
/// - an [`ApplicationError`] with a fatal URI is [`Disposition::Fatal`]
///   (by default only [`NO_SUCH_REALM`])
/// - an [`ApplicationError`] with a retryable URI, or any application error
///   when [`retry_application_errors`](Self::retry_application_errors) is on,
///   is [`Disposition::Retryable`]
/// - a [`TlsError`] is [`Disposition::TransportLocal`]
/// - everything else is [`Disposition::Unclassified`]
#[derive(Debug, Clone)]
pub struct DefaultClassifier {
    fatal_uris: HashSet<String>,
    retryable_uris: HashSet<String>,
    retry_application_errors: bool,
}

impl DefaultClassifier {
    /// Creates the default classifier.
    pub fn new() -> Self {
        Self {
            fatal_uris: HashSet::from([NO_SUCH_REALM.to_string()]),
            retryable_uris: HashSet::new(),
            retry_application_errors: false,
        }
    }

    /// Adds a URI that ends the component immediately.
    pub fn fatal_uri(mut self, uri: impl Into<String>) -> Self {
        self.fatal_uris.insert(uri.into());
        self
    }

    /// Adds a URI worth another attempt.
    pub fn retryable_uri(mut self, uri: impl Into<String>) -> Self {
        self.retryable_uris.insert(uri.into());
        self
    }

    /// Treats every non-fatal application error as retryable.
    pub fn retry_application_errors(mut self, retry: bool) -> Self {
        self.retry_application_errors = retry;
        self
    }

    fn classify_application(&self, error: &ApplicationError) -> Disposition {
        if self.fatal_uris.contains(&error.uri) {
            Disposition::Fatal
        } else if self.retry_application_errors || self.retryable_uris.contains(&error.uri) {
            Disposition::Retryable
        } else {
            Disposition::Unclassified
        }
    }
}

impl Default for DefaultClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, error: &(dyn Error + 'static)) -> Disposition {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(app) = err.downcast_ref::<ApplicationError>() {
                return self.classify_application(app);
            }
            if err.is::<TlsError>() {
                return Disposition::TransportLocal;
            }
            current = err.source();
        }
        Disposition::Unclassified
    }
}

/// Classifier backed by a closure.
///
/// # Example
///
/// ```rust
/// use std::io;
/// use tower_failover_component::{Disposition, ErrorClassifier, FnClassifier};
///
/// // Retry refused connections, give up on everything else.
/// let classifier = FnClassifier::new(|error| match error.downcast_ref::<io::Error>() {
///     Some(e) if e.kind() == io::ErrorKind::ConnectionRefused => Disposition::Retryable,
///     _ => Disposition::Unclassified,
/// });
///
/// let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
/// assert_eq!(classifier.classify(&refused), Disposition::Retryable);
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: F,
}

impl<F> FnClassifier<F>
where
    F: Fn(&(dyn Error + 'static)) -> Disposition + Send + Sync,
{
    /// Wraps a classification closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ErrorClassifier for FnClassifier<F>
where
    F: Fn(&(dyn Error + 'static)) -> Disposition + Send + Sync,
{
    fn classify(&self, error: &(dyn Error + 'static)) -> Disposition {
        (self.f)(error)
    }
}

impl<F> fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnClassifier").finish_non_exhaustive()
    }
}
