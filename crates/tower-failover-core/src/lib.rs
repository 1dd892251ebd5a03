//! Core infrastructure for tower-failover.
//!
//! This crate holds the pieces shared by the transport and component crates:
//! - Lifecycle event trait and panic-isolated listener collections
//! - The boxed error type that carries connector failures unchanged

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, LifecycleEvent};

/// Type-erased error raised by connectors and sessions.
///
/// Failures travel through the engine in this form so that classifiers can
/// downcast the original error instead of a lossy wrapper.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
