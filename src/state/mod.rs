//! State management module
//!
//! The timer state machine and the application state hosting timers.

pub mod app_state;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, HostedTimer, TimerNotification};
pub use timer_state::{
    InvalidStateTransition, TimerEvent, TimerMode, TimerSnapshot, TimerState, TimerStatus,
    Transition,
};
