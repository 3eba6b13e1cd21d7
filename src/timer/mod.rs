//! Timer controller
//!
//! A [`Timer`] binds one [`TimerState`] to one tick source and to the
//! observers interested in it. All control methods are synchronous; the tick
//! source is the only thing that changes the timer in the background.
//!
//! Every tick registration gets a generation number. Any transition that
//! leaves the running state cancels the registration and bumps the
//! generation under the same lock, so a tick that was already in flight
//! when the timer was paused or stopped is recognised and dropped.
//!
//! Callback observers are fed from a queue that is filled under the same
//! lock as the transition, so they see events in the order they happened
//! even when ticks and control calls run on different threads.

pub mod observer;

use std::{
    collections::VecDeque,
    convert::Infallible,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::{
    state::{InvalidStateTransition, TimerEvent, TimerSnapshot, TimerState, Transition},
    tasks::tick_source::{schedule_tick, TickHandle, TICK_PERIOD},
};

pub use observer::TimerObserver;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// A running stopwatch or countdown. Cloning yields another handle to the
/// same timer.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<Inner>,
}

struct Inner {
    core: Mutex<Core>,
    tick_period: Duration,
    events_tx: broadcast::Sender<TimerEvent>,
    snapshot_tx: watch::Sender<TimerSnapshot>,
    observers: Mutex<Vec<Arc<dyn TimerObserver>>>,
    delivery: Mutex<Delivery>,
}

/// Events waiting for callback observers
#[derive(Default)]
struct Delivery {
    queue: VecDeque<TimerEvent>,
    // Some thread is currently draining the queue
    active: bool,
}

struct Core {
    state: TimerState,
    tick: Option<TickHandle>,
    generation: u64,
    disposed: bool,
}

impl Timer {
    /// A stopwatch ticking once per second
    pub fn stopwatch() -> Self {
        Self::new(TimerState::stopwatch(), TICK_PERIOD)
    }

    /// A countdown from `initial_seconds`, ticking once per second
    pub fn countdown(initial_seconds: u64) -> Self {
        Self::new(TimerState::countdown(initial_seconds), TICK_PERIOD)
    }

    /// Build a timer around an existing state with a custom tick period
    pub fn new(state: TimerState, tick_period: Duration) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    state,
                    tick: None,
                    generation: 0,
                    disposed: false,
                }),
                tick_period,
                events_tx,
                snapshot_tx,
                observers: Mutex::new(Vec::new()),
                delivery: Mutex::new(Delivery::default()),
            }),
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.inner.lock_core().state.snapshot()
    }

    /// Whether a tick source is currently scheduled for this timer
    pub fn has_live_tick(&self) -> bool {
        self.inner
            .lock_core()
            .tick
            .as_ref()
            .is_some_and(TickHandle::is_live)
    }

    /// Start counting. Must be called from within a tokio runtime.
    pub fn start(&self) -> TimerSnapshot {
        self.inner
            .apply("start", |state| Ok::<_, Infallible>(state.start()))
            .unwrap_or_else(|never| match never {})
    }

    /// Pause a running timer
    pub fn pause(&self) -> Result<TimerSnapshot, InvalidStateTransition> {
        self.inner
            .apply("pause", TimerState::pause)
            .inspect_err(|e| warn!("Rejected: {}", e))
    }

    /// Resume a paused timer. Must be called from within a tokio runtime.
    pub fn resume(&self) -> Result<TimerSnapshot, InvalidStateTransition> {
        self.inner
            .apply("resume", TimerState::resume)
            .inspect_err(|e| warn!("Rejected: {}", e))
    }

    /// Stop the timer and restore its initial value
    pub fn stop(&self) -> TimerSnapshot {
        self.inner
            .apply("stop", |state| Ok::<_, Infallible>(state.stop()))
            .unwrap_or_else(|never| match never {})
    }

    /// Cancel the tick source for good. A running timer is left paused at its
    /// last value without notifying observers, and every later control call
    /// is ignored.
    pub fn dispose(&self) {
        let mut core = self.inner.lock_core();
        if !core.disposed {
            core.disposed = true;
            core.cancel_ticks();
            if core.state.is_running() {
                // Teardown: the pause event has nobody left to inform
                let _ = core.state.pause();
            }
            debug!("Timer disposed at value {}", core.state.value());
        }
    }

    /// Subscribe to the stream of events
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Watch the latest snapshot
    pub fn watch(&self) -> watch::Receiver<TimerSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Register a callback observer
    pub fn add_observer(&self, observer: Arc<dyn TimerObserver>) {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.inner.lock_core().generation
    }

    #[cfg(test)]
    fn fire_tick(&self, generation: u64) {
        Inner::on_tick(&self.inner, generation);
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("state", &self.inner.lock_core().state)
            .finish()
    }
}

impl Inner {
    fn lock_core(&self) -> MutexGuard<'_, Core> {
        // State is only mutated through complete transitions; observers run
        // outside this lock, so a poisoned guard still holds a valid state.
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delivery(&self) -> MutexGuard<'_, Delivery> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply<E, F>(self: &Arc<Self>, operation: &str, f: F) -> Result<TimerSnapshot, E>
    where
        F: FnOnce(&mut TimerState) -> Result<Transition, E>,
    {
        let snapshot = {
            let mut core = self.lock_core();
            if core.disposed {
                debug!("Ignoring {} on a disposed timer", operation);
                return Ok(core.state.snapshot());
            }

            let from = core.state.status();
            let transition = f(&mut core.state)?;

            if transition.wants_ticks {
                self.ensure_ticking(&mut core);
            } else {
                core.cancel_ticks();
            }

            let snapshot = self.publish(&core, &transition.events);
            info!(
                "Timer {}: {} -> {} (value {})",
                operation, from, snapshot.status, snapshot.value
            );
            snapshot
        };

        self.drain_observers();
        Ok(snapshot)
    }

    fn ensure_ticking(self: &Arc<Self>, core: &mut Core) {
        if core.disposed || core.tick.as_ref().is_some_and(TickHandle::is_live) {
            return;
        }

        core.generation += 1;
        let generation = core.generation;
        let weak: Weak<Inner> = Arc::downgrade(self);

        core.tick = Some(schedule_tick(self.tick_period, move || {
            if let Some(inner) = weak.upgrade() {
                Inner::on_tick(&inner, generation);
            }
        }));
        debug!("Scheduled tick source generation {}", generation);
    }

    fn on_tick(self: &Arc<Self>, generation: u64) {
        {
            let mut core = self.lock_core();
            if core.generation != generation || core.tick.is_none() {
                debug!("Dropping stale tick from generation {}", generation);
                return;
            }

            let transition = core.state.tick();
            if !transition.wants_ticks {
                core.cancel_ticks();
            }
            if transition.events.is_empty() {
                return;
            }

            let snapshot = self.publish(&core, &transition.events);
            debug!("Tick: {:?} value {}", snapshot.status, snapshot.value);
        }

        self.drain_observers();
    }

    // Runs under the core lock so channel subscribers and the observer queue
    // see events in the order they were applied.
    fn publish(&self, core: &Core, events: &[TimerEvent]) -> TimerSnapshot {
        for event in events {
            // No subscribers is fine
            let _ = self.events_tx.send(*event);
        }
        if !events.is_empty() {
            self.lock_delivery().queue.extend(events.iter().copied());
        }

        let snapshot = core.state.snapshot();
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Hand queued events to callback observers, one event at a time.
    ///
    /// Only one thread drains at once; a caller that finds a drain in
    /// progress (including an observer calling back into its timer) leaves
    /// its events to that thread.
    fn drain_observers(&self) {
        {
            let mut delivery = self.lock_delivery();
            if delivery.active || delivery.queue.is_empty() {
                return;
            }
            delivery.active = true;
        }

        loop {
            let event = {
                let mut delivery = self.lock_delivery();
                match delivery.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        delivery.active = false;
                        return;
                    }
                }
            };

            let observers = self
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();

            for observer in &observers {
                observer::deliver(observer.as_ref(), &event);
            }
        }
    }
}

impl Core {
    fn cancel_ticks(&mut self) {
        if let Some(mut tick) = self.tick.take() {
            tick.cancel();
            self.generation += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::sleep;

    use super::*;
    use crate::state::TimerStatus;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<TimerEvent>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<TimerEvent> {
            self.events.lock().unwrap().clone()
        }

        fn ends(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| **e == TimerEvent::End)
                .count()
        }
    }

    impl TimerObserver for Recorder {
        fn notify(&self, event: &TimerEvent) {
            self.events.lock().unwrap().push(*event);
        }
    }

    fn observed(timer: &Timer) -> Arc<Recorder> {
        let recorder = Arc::new(Recorder::default());
        timer.add_observer(recorder.clone());
        recorder
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test(start_paused = true)]
    async fn stopwatch_ticks_every_second() {
        let timer = Timer::stopwatch();
        let recorder = observed(&timer);

        timer.start();
        sleep(ms(3500)).await;

        assert_eq!(timer.snapshot().value, 3);
        assert_eq!(
            recorder.events(),
            vec![
                TimerEvent::Times { value: 1 },
                TimerEvent::Times { value: 2 },
                TimerEvent::Times { value: 3 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_does_not_tick() {
        let timer = Timer::stopwatch();

        sleep(ms(5000)).await;

        assert_eq!(timer.snapshot().value, 0);
        assert!(!timer.has_live_tick());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_runs_to_zero_and_ends_once() {
        let timer = Timer::countdown(3);
        let recorder = observed(&timer);

        timer.start();
        sleep(ms(10_500)).await;

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.value, 0);
        assert_eq!(snapshot.status, TimerStatus::Stopped);
        assert_eq!(recorder.ends(), 1);
        assert!(!timer.has_live_tick());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_until_resume() {
        let timer = Timer::stopwatch();
        let recorder = observed(&timer);

        timer.start();
        sleep(ms(2500)).await;

        let paused = timer.pause().unwrap();
        assert_eq!(paused.value, 2);
        assert!(!timer.has_live_tick());
        assert_eq!(recorder.events().last(), Some(&TimerEvent::Pause { value: 2 }));

        sleep(ms(10_000)).await;
        assert_eq!(timer.snapshot().value, 2);

        // Resumed at 12.5s; ticks follow at 13.5s and 14.5s
        timer.resume().unwrap();
        sleep(ms(2200)).await;
        assert_eq!(timer.snapshot().value, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_resets_and_silences_ticks() {
        let timer = Timer::countdown(60);
        let recorder = observed(&timer);

        timer.start();
        sleep(ms(4500)).await;
        assert_eq!(timer.snapshot().value, 56);

        let stale = timer.generation();
        let stopped = timer.stop();
        assert_eq!(stopped.value, 60);
        assert_eq!(stopped.status, TimerStatus::Stopped);

        let seen = recorder.events().len();
        timer.fire_tick(stale);
        timer.fire_tick(timer.generation());
        sleep(ms(5000)).await;

        assert_eq!(recorder.events().len(), seen);
        assert_eq!(timer.snapshot().value, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn double_stop_is_harmless() {
        let timer = Timer::stopwatch();
        let recorder = observed(&timer);

        timer.start();
        sleep(ms(1500)).await;

        timer.stop();
        timer.stop();

        assert_eq!(timer.snapshot().value, 0);
        assert_eq!(recorder.ends(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_start_keeps_one_tick_source() {
        let timer = Timer::stopwatch();

        timer.start();
        let generation = timer.generation();
        sleep(ms(500)).await;
        timer.start();
        timer.start();
        assert_eq!(timer.generation(), generation);

        sleep(ms(2000)).await;
        assert_eq!(timer.snapshot().value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_transition_leaves_state_alone() {
        let timer = Timer::stopwatch();

        let err = timer.resume().unwrap_err();
        assert_eq!(err.from, TimerStatus::Idle);
        assert!(!timer.has_live_tick());
        assert_eq!(timer.snapshot().status, TimerStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_running_ticks() {
        let timer = Timer::stopwatch();

        timer.start();
        sleep(ms(1500)).await;
        timer.dispose();
        sleep(ms(5000)).await;

        assert_eq!(timer.snapshot().value, 1);
        assert_eq!(timer.snapshot().status, TimerStatus::Paused);
        assert!(!timer.has_live_tick());

        // A disposed timer ignores control calls and never schedules again
        let snapshot = timer.start();
        assert_eq!(snapshot.status, TimerStatus::Paused);
        let snapshot = timer.resume().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Paused);
        assert!(!timer.has_live_tick());

        sleep(ms(3000)).await;
        assert_eq!(timer.snapshot().value, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_observer_sees_end_after_last_times() {
        struct Slow {
            events: Mutex<Vec<TimerEvent>>,
        }

        impl TimerObserver for Slow {
            fn on_times(&self, value: u64) {
                std::thread::sleep(ms(300));
                self.events.lock().unwrap().push(TimerEvent::Times { value });
            }

            fn on_end(&self) {
                self.events.lock().unwrap().push(TimerEvent::End);
            }
        }

        let timer = Timer::new(TimerState::stopwatch(), ms(100));
        let slow = Arc::new(Slow {
            events: Mutex::new(Vec::new()),
        });
        timer.add_observer(slow.clone());
        let mut events = timer.subscribe();

        timer.start();
        assert!(matches!(events.recv().await.unwrap(), TimerEvent::Times { .. }));
        timer.stop();

        // Let the tick thread finish delivering whatever it queued
        sleep(ms(1500)).await;

        let seen = slow.events.lock().unwrap().clone();
        assert_eq!(seen.last(), Some(&TimerEvent::End), "observer saw {:?}", seen);
        assert_eq!(seen.iter().filter(|e| **e == TimerEvent::End).count(), 1);
        assert!(seen.len() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_last_handle_cancels_ticks() {
        let timer = Timer::stopwatch();
        let mut events = timer.subscribe();

        timer.start();
        sleep(ms(1500)).await;
        assert_eq!(events.recv().await.unwrap(), TimerEvent::Times { value: 1 });

        drop(timer);
        sleep(ms(3000)).await;

        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn watchers_see_latest_snapshot() {
        let timer = Timer::countdown(10);
        let watch = timer.watch();

        timer.start();
        sleep(ms(2500)).await;

        assert_eq!(watch.borrow().value, 8);
        assert_eq!(watch.borrow().display, "00:08");
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_observer_does_not_break_the_timer() {
        struct Panicky;
        impl TimerObserver for Panicky {
            fn on_times(&self, _value: u64) {
                panic!("boom");
            }
        }

        let timer = Timer::stopwatch();
        timer.add_observer(Arc::new(Panicky));
        let recorder = observed(&timer);

        timer.start();
        sleep(ms(2500)).await;

        assert_eq!(timer.snapshot().value, 2);
        assert_eq!(recorder.events().len(), 2);
    }
}
