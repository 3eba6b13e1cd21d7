//! Observer interface for timer events

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::state::TimerEvent;

/// Receives timer events. Every method defaults to doing nothing.
///
/// Observers are called after the timer's state has been updated and its
/// lock released, so a slow or panicking observer cannot corrupt the timer.
pub trait TimerObserver: Send + Sync {
    /// The value changed on a tick
    fn on_times(&self, _value: u64) {}

    /// The timer was paused
    fn on_pause(&self, _value_at_pause: u64) {}

    /// The timer was stopped or the countdown reached zero
    fn on_end(&self) {}

    /// Route an event to the matching callback
    fn notify(&self, event: &TimerEvent) {
        match *event {
            TimerEvent::Times { value } => self.on_times(value),
            TimerEvent::Pause { value } => self.on_pause(value),
            TimerEvent::End => self.on_end(),
        }
    }
}

/// Deliver `event` to `observer`, logging instead of unwinding on panic.
pub(crate) fn deliver(observer: &dyn TimerObserver, event: &TimerEvent) {
    if catch_unwind(AssertUnwindSafe(|| observer.notify(event))).is_err() {
        error!("Timer observer panicked while handling {:?}", event);
    }
}
