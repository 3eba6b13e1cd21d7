//! timerd - A state-managed HTTP server hosting stopwatch and countdown timers
//!
//! This is the main entry point for the timerd application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use timerd::{
    api::serve,
    config::Config,
    state::AppState,
    tasks::event_logger_task,
    utils::{format_clock, shutdown_signal},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("timerd={},tower_http=info", config.log_level()))
        .init();

    info!("Starting timerd v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, tick={}ms, default countdown={}",
        config.host,
        config.port,
        config.tick_period().as_millis(),
        format_clock(config.default_countdown_seconds())
    );

    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        config.tick_period(),
        config.default_countdown_seconds(),
    ));

    // Log timer events in the background
    let logger_state = Arc::clone(&state);
    tokio::spawn(async move {
        event_logger_task(logger_state).await;
    });

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /timers            - Create a stopwatch or countdown");
    info!("  GET    /timers            - List timers");
    info!("  GET    /timers/:id        - Get one timer");
    info!("  DELETE /timers/:id        - Remove a timer");
    info!("  POST   /timers/:id/start  - Start");
    info!("  POST   /timers/:id/pause  - Pause");
    info!("  POST   /timers/:id/resume - Resume");
    info!("  POST   /timers/:id/stop   - Stop and reset");
    info!("  GET    /status            - Server status");
    info!("  GET    /health            - Health check");

    serve(listener, state, shutdown_signal()).await;
    info!("Server shutdown complete");
    Ok(())
}
