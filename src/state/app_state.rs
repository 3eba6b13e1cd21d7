//! Main application state management

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::{TimerEvent, TimerMode, TimerSnapshot, TimerState, TimerStatus};
use crate::{
    timer::{Timer, TimerObserver},
    utils::format_uptime,
};

/// A timer event tagged with the id of the timer that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerNotification {
    pub timer_id: u64,
    #[serde(flatten)]
    pub event: TimerEvent,
}

/// A hosted timer's snapshot together with its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedTimer {
    pub id: u64,
    #[serde(flatten)]
    pub timer: TimerSnapshot,
}

impl HostedTimer {
    pub fn new(id: u64, timer: TimerSnapshot) -> Self {
        Self { id, timer }
    }
}

/// Forwards one timer's events onto the application-wide channel
struct ForwardObserver {
    timer_id: u64,
    tx: broadcast::Sender<TimerNotification>,
}

impl TimerObserver for ForwardObserver {
    fn notify(&self, event: &TimerEvent) {
        // Nobody listening is fine
        let _ = self.tx.send(TimerNotification {
            timer_id: self.timer_id,
            event: *event,
        });
    }
}

/// Main application state that owns every hosted timer
#[derive(Debug)]
pub struct AppState {
    /// Hosted timers by id
    timers: Mutex<BTreeMap<u64, Timer>>,
    next_id: Mutex<u64>,
    /// Tick spacing used for new timers
    pub tick_period: Duration,
    /// Countdown length used when a create request gives no fields
    pub default_countdown_seconds: u64,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Events from every hosted timer
    pub timer_event_tx: broadcast::Sender<TimerNotification>,
}

impl AppState {
    /// Create an empty AppState
    pub fn new(
        port: u16,
        host: String,
        tick_period: Duration,
        default_countdown_seconds: u64,
    ) -> Self {
        let (timer_event_tx, _) = broadcast::channel(100);

        Self {
            timers: Mutex::new(BTreeMap::new()),
            next_id: Mutex::new(1),
            tick_period,
            default_countdown_seconds,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            timer_event_tx,
        }
    }

    /// Create and register a new timer.
    ///
    /// `initial_seconds` is only used for countdowns; `None` falls back to
    /// the configured default.
    pub fn create_timer(
        &self,
        mode: TimerMode,
        initial_seconds: Option<u64>,
    ) -> Result<HostedTimer, String> {
        let state = match mode {
            TimerMode::Stopwatch => TimerState::stopwatch(),
            TimerMode::Countdown => {
                TimerState::countdown(initial_seconds.unwrap_or(self.default_countdown_seconds))
            }
        };
        let timer = Timer::new(state, self.tick_period);

        let id = {
            let mut next_id = self.next_id.lock()
                .map_err(|e| format!("Failed to lock timer ids: {}", e))?;
            let id = *next_id;
            *next_id += 1;
            id
        };

        timer.add_observer(Arc::new(ForwardObserver {
            timer_id: id,
            tx: self.timer_event_tx.clone(),
        }));
        let snapshot = timer.snapshot();

        self.timers.lock()
            .map_err(|e| format!("Failed to lock timers: {}", e))?
            .insert(id, timer);

        info!("Created {:?} timer {} at {}", mode, id, snapshot.display);
        self.record_action(&format!("create {}", id));
        Ok(HostedTimer::new(id, snapshot))
    }

    /// Look up a timer by id
    pub fn get_timer(&self, id: u64) -> Result<Option<Timer>, String> {
        self.timers.lock()
            .map(|timers| timers.get(&id).cloned())
            .map_err(|e| format!("Failed to lock timers: {}", e))
    }

    /// Snapshots of every hosted timer, ordered by id
    pub fn list_timers(&self) -> Result<Vec<HostedTimer>, String> {
        let timers: Vec<(u64, Timer)> = self.timers.lock()
            .map(|timers| timers.iter().map(|(id, t)| (*id, t.clone())).collect())
            .map_err(|e| format!("Failed to lock timers: {}", e))?;

        Ok(timers
            .into_iter()
            .map(|(id, timer)| HostedTimer::new(id, timer.snapshot()))
            .collect())
    }

    /// Dispose a timer and forget it. Returns its final snapshot.
    pub fn remove_timer(&self, id: u64) -> Result<Option<HostedTimer>, String> {
        let removed = self.timers.lock()
            .map_err(|e| format!("Failed to lock timers: {}", e))?
            .remove(&id);

        Ok(removed.map(|timer| {
            timer.dispose();
            info!("Removed timer {}", id);
            self.record_action(&format!("delete {}", id));
            HostedTimer::new(id, timer.snapshot())
        }))
    }

    /// Dispose every hosted timer, e.g. on shutdown
    pub fn dispose_all(&self) {
        match self.timers.lock() {
            Ok(mut timers) => {
                for (id, timer) in std::mem::take(&mut *timers) {
                    timer.dispose();
                    info!("Disposed timer {}", id);
                }
            }
            Err(e) => warn!("Failed to lock timers for disposal: {}", e),
        }
    }

    /// Count of timers currently running
    pub fn running_count(&self) -> Result<usize, String> {
        Ok(self
            .list_timers()?
            .iter()
            .filter(|t| t.timer.status == TimerStatus::Running)
            .count())
    }

    /// Remember the most recent control action
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed())
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
