//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::countdown::parse_countdown;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "timerd")]
#[command(about = "A state-managed HTTP server hosting stopwatch and countdown timers")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Milliseconds between timer ticks
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,

    /// Hours of the default countdown
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub hours: String,

    /// Minutes of the default countdown, clamped to 0-59
    #[arg(long, default_value = "5", allow_hyphen_values = true)]
    pub minutes: String,

    /// Seconds of the default countdown, clamped to 0-59
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub seconds: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Tick spacing; never zero
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Default countdown length in seconds
    pub fn default_countdown_seconds(&self) -> u64 {
        parse_countdown(&self.hours, &self.minutes, &self.seconds)
    }
}
