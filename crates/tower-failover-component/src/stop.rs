//! Explicit stop requests for running components.

use tokio_util::sync::CancellationToken;

/// Creates a connected stop handle and signal.
///
/// The signal can be cloned and shared between components; stopping the
/// handle reaches all of them.
pub fn stop_signal() -> (StopHandle, StopSignal) {
    let token = CancellationToken::new();
    (StopHandle { token: token.clone() }, StopSignal { token })
}

/// Requests that components stop at their next loop boundary.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Asks every component holding the paired signal to stop.
    ///
    /// Components stop before their next attempt, or right away if they are
    /// waiting out a backoff delay. A session that is already running is not
    /// interrupted.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Whether stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Observes stop requests.
///
/// Dropping the [`StopHandle`] without calling `stop` never stops anything.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Whether stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once stop is requested; pends forever otherwise.
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }
}

/// Stops components when the token, or any of its parents, is cancelled.
impl From<CancellationToken> for StopSignal {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}
