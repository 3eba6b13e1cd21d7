//! Periodic tick source backed by a tokio interval

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Default spacing between ticks
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle to a scheduled tick source. Dropping it cancels the ticks.
#[derive(Debug)]
pub struct TickHandle {
    task: Option<JoinHandle<()>>,
}

impl TickHandle {
    /// Stop firing. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Cancelling tick source");
            task.abort();
        }
    }

    /// Whether this handle still owns a scheduled tick source
    pub fn is_live(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Call `callback` once every `period`, starting one period from now.
///
/// Late ticks are delivered late rather than bunched up or skipped. Must be
/// called from within a tokio runtime.
pub fn schedule_tick<F>(period: Duration, mut callback: F) -> TickHandle
where
    F: FnMut() + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            callback();
        }
    });

    TickHandle { task: Some(task) }
}
