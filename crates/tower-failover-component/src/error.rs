//! Results of running a component.

use crate::attempt::SessionEnd;
use std::error::Error;
use tower_failover_core::BoxError;

/// A component that stopped without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Done {
    /// A session ran to completion.
    Success(SessionEnd),
    /// Every transport used up its budget or was disqualified.
    Exhausted,
    /// A stop was requested.
    Cancelled,
}

/// A component that stopped because of an error.
///
/// The connector's original error is kept untouched; reach it through
/// [`Error::source`], [`get_ref`](Self::get_ref) or
/// [`into_inner`](Self::into_inner).
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// A fatal rejection, e.g. an unknown realm.
    #[error("component '{component}': fatal error on transport {transport}, not reconnecting: {source}")]
    Fatal {
        /// Component name.
        component: String,
        /// Transport the error happened on.
        transport: usize,
        /// Original error.
        source: BoxError,
    },

    /// An unclassified failure.
    #[error("component '{component}': connection failed on transport {transport}: {source}")]
    Failed {
        /// Component name.
        component: String,
        /// Transport the error happened on.
        transport: usize,
        /// Original error.
        source: BoxError,
    },

    /// The component panicked while running.
    #[error("component '{component}' panicked: {message}")]
    Panicked {
        /// Component name.
        component: String,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl ComponentError {
    /// Returns true for [`ComponentError::Fatal`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, ComponentError::Fatal { .. })
    }

    /// Name of the component that failed.
    pub fn component(&self) -> &str {
        match self {
            ComponentError::Fatal { component, .. }
            | ComponentError::Failed { component, .. }
            | ComponentError::Panicked { component, .. } => component,
        }
    }

    /// Transport the failure happened on, if any.
    pub fn transport(&self) -> Option<usize> {
        match self {
            ComponentError::Fatal { transport, .. } | ComponentError::Failed { transport, .. } => {
                Some(*transport)
            }
            ComponentError::Panicked { .. } => None,
        }
    }

    /// The original error raised by the connector.
    pub fn get_ref(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            ComponentError::Fatal { source, .. } | ComponentError::Failed { source, .. } => {
                Some(source.as_ref())
            }
            ComponentError::Panicked { .. } => None,
        }
    }

    /// Consumes the error, returning the connector's original error.
    pub fn into_inner(self) -> Option<BoxError> {
        match self {
            ComponentError::Fatal { source, .. } | ComponentError::Failed { source, .. } => {
                Some(source)
            }
            ComponentError::Panicked { .. } => None,
        }
    }
}
