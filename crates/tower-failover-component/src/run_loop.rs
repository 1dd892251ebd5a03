//! The run loop components schedule their waits on.

use std::time::Duration;
use tokio::time::Sleep;

/// Scheduler handle a component suspends on between attempts.
///
/// Always passed explicitly to [`Component::start`](crate::Component::start)
/// and [`supervise`](crate::supervise); nothing falls back to an ambient
/// runtime.
pub trait RunLoop: Send + Sync {
    /// A timer that completes after `duration` on this run loop.
    fn sleep(&self, duration: Duration) -> Sleep;
}

/// Timers are registered with the runtime the handle belongs to.
impl RunLoop for tokio::runtime::Handle {
    fn sleep(&self, duration: Duration) -> Sleep {
        let _entered = self.enter();
        tokio::time::sleep(duration)
    }
}
