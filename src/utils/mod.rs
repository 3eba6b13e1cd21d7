//! Utility functions module
//!
//! Formatting helpers and signal handling shared by the server and the engine.

pub mod format;
pub mod signals;

pub use format::{format_clock, format_uptime};
pub use signals::shutdown_signal;
