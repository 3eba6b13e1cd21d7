//! timerd - A state-managed HTTP server hosting stopwatch and countdown timers
//!
//! The core is a small timer engine: a state machine ([`state::TimerState`])
//! driven by a once-per-second tick source ([`tasks::tick_source`]) and
//! wrapped in a [`Timer`] that owns the tick registration and reports events
//! to observers. Countdown lengths come from [`countdown::parse_countdown`].

pub mod api;
pub mod config;
pub mod countdown;
pub mod state;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use countdown::{parse_countdown, CountdownInput};
pub use state::{AppState, TimerEvent, TimerMode, TimerSnapshot, TimerStatus};
pub use timer::{Timer, TimerObserver};
pub use api::{create_router, serve};
pub use utils::signals::shutdown_signal;
