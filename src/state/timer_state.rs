//! Timer state machine
//!
//! A `TimerState` holds the mode, value and status of one stopwatch or
//! countdown. It knows nothing about scheduling: every operation returns the
//! events it produced and the caller decides what to do with the tick source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::format_clock;

/// Counting direction, fixed for the lifetime of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Stopwatch,
    Countdown,
}

/// Lifecycle status of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Something an observer should be told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TimerEvent {
    /// The value changed because of a tick
    Times { value: u64 },
    /// The timer was paused at `value`
    Pause { value: u64 },
    /// The timer was stopped or the countdown ran out
    End,
}

/// An operation was called from a status that does not allow it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidStateTransition {
    pub operation: &'static str,
    pub from: TimerStatus,
}

impl fmt::Display for InvalidStateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {} a timer that is {}", self.operation, self.from)
    }
}

impl std::error::Error for InvalidStateTransition {}

/// Result of applying one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Events to hand to observers, in order
    pub events: Vec<TimerEvent>,
    /// Whether the tick source should be running after this transition
    pub wants_ticks: bool,
}

impl Transition {
    fn new(wants_ticks: bool) -> Self {
        Self {
            events: Vec::new(),
            wants_ticks,
        }
    }

    fn with(mut self, event: TimerEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// Point-in-time copy of a timer for observers and API responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub status: TimerStatus,
    pub value: u64,
    pub initial_value: u64,
    /// `value` formatted as a clock face
    pub display: String,
}

/// State of a single stopwatch or countdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    mode: TimerMode,
    value: u64,
    initial_value: u64,
    status: TimerStatus,
}

impl TimerState {
    /// A stopwatch counting up from zero
    pub fn stopwatch() -> Self {
        Self {
            mode: TimerMode::Stopwatch,
            value: 0,
            initial_value: 0,
            status: TimerStatus::Idle,
        }
    }

    /// A countdown from `initial_value` seconds to zero
    pub fn countdown(initial_value: u64) -> Self {
        Self {
            mode: TimerMode::Countdown,
            value: initial_value,
            initial_value,
            status: TimerStatus::Idle,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn initial_value(&self) -> u64 {
        self.initial_value
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            status: self.status,
            value: self.value,
            initial_value: self.initial_value,
            display: format_clock(self.value),
        }
    }

    /// Begin counting. Already running is a no-op; starting from `Stopped`
    /// reloads the initial value.
    pub fn start(&mut self) -> Transition {
        match self.status {
            TimerStatus::Running => {}
            TimerStatus::Stopped => {
                self.value = self.initial_value;
                self.status = TimerStatus::Running;
            }
            TimerStatus::Idle | TimerStatus::Paused => {
                self.status = TimerStatus::Running;
            }
        }
        Transition::new(true)
    }

    /// Freeze the value. Only valid while running.
    pub fn pause(&mut self) -> Result<Transition, InvalidStateTransition> {
        if !self.is_running() {
            return Err(InvalidStateTransition {
                operation: "pause",
                from: self.status,
            });
        }
        self.status = TimerStatus::Paused;
        Ok(Transition::new(false).with(TimerEvent::Pause { value: self.value }))
    }

    /// Continue after a pause. Only valid while paused.
    pub fn resume(&mut self) -> Result<Transition, InvalidStateTransition> {
        if self.status != TimerStatus::Paused {
            return Err(InvalidStateTransition {
                operation: "resume",
                from: self.status,
            });
        }
        self.status = TimerStatus::Running;
        Ok(Transition::new(true))
    }

    /// Stop from any status and restore the initial value.
    ///
    /// Stopping an already stopped timer only restores the value; `End` is
    /// not reported a second time.
    pub fn stop(&mut self) -> Transition {
        let was_stopped = self.status == TimerStatus::Stopped;
        self.status = TimerStatus::Stopped;
        self.value = self.initial_value;

        if was_stopped {
            Transition::new(false)
        } else {
            Transition::new(false).with(TimerEvent::End)
        }
    }

    /// Apply one elapsed second. Ignored unless running.
    pub fn tick(&mut self) -> Transition {
        if !self.is_running() {
            return Transition::new(false);
        }

        match self.mode {
            TimerMode::Stopwatch => {
                self.value = self.value.saturating_add(1);
                Transition::new(true).with(TimerEvent::Times { value: self.value })
            }
            TimerMode::Countdown if self.value > 0 => {
                self.value -= 1;
                let transition =
                    Transition::new(true).with(TimerEvent::Times { value: self.value });
                if self.value == 0 {
                    self.finish(transition)
                } else {
                    transition
                }
            }
            TimerMode::Countdown => self.finish(Transition::new(true)),
        }
    }

    // Countdown ran out: the value stays at zero for display.
    fn finish(&mut self, mut transition: Transition) -> Transition {
        self.status = TimerStatus::Stopped;
        transition.wants_ticks = false;
        transition.with(TimerEvent::End)
    }
}
