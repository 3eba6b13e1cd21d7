//! Background tasks module
//!
//! The per-timer tick source and tasks that run alongside the HTTP server.

pub mod event_logger;
pub mod tick_source;

// Re-export main functions
pub use event_logger::event_logger_task;
pub use tick_source::{schedule_tick, TickHandle, TICK_PERIOD};
