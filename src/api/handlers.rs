//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    state::{AppState, HostedTimer, InvalidStateTransition, TimerMode, TimerSnapshot},
    timer::Timer,
};
use super::responses::{
    ApiError, CreateTimerRequest, HealthResponse, StatusResponse, TimerListResponse,
    TimerResponse,
};

fn find_timer(state: &AppState, id: u64) -> Result<Timer, ApiError> {
    match state.get_timer(id) {
        Ok(Some(timer)) => Ok(timer),
        Ok(None) => {
            warn!("Timer {} not found", id);
            Err(ApiError::not_found(id))
        }
        Err(e) => {
            error!("Failed to look up timer {}: {}", id, e);
            Err(ApiError::internal(e))
        }
    }
}

/// Run one control operation against a hosted timer
fn control<F>(
    state: &AppState,
    id: u64,
    action: &str,
    operation: F,
) -> Result<Json<TimerResponse>, ApiError>
where
    F: FnOnce(&Timer) -> Result<TimerSnapshot, InvalidStateTransition>,
{
    let timer = find_timer(state, id)?;
    let snapshot = operation(&timer).map_err(|e| {
        warn!("Timer {} rejected {}: {}", id, action, e);
        ApiError::from(e)
    })?;

    state.record_action(&format!("{} {}", action, id));
    info!("{} endpoint called for timer {}", action, id);

    Ok(Json(TimerResponse::ok(
        format!("Timer {} {}", id, snapshot.status),
        HostedTimer::new(id, snapshot),
    )))
}

/// Handle POST /timers - Create a stopwatch or countdown
pub async fn create_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTimerRequest>,
) -> Result<(StatusCode, Json<TimerResponse>), ApiError> {
    let initial_seconds = match request.mode {
        TimerMode::Countdown if !request.countdown.is_empty() => {
            Some(request.countdown.total_seconds())
        }
        _ => None,
    };

    match state.create_timer(request.mode, initial_seconds) {
        Ok(hosted) => Ok((
            StatusCode::CREATED,
            Json(TimerResponse::ok(format!("Timer {} created", hosted.id), hosted)),
        )),
        Err(e) => {
            error!("Failed to create timer: {}", e);
            Err(ApiError::internal(e))
        }
    }
}

/// Handle GET /timers - List every hosted timer
pub async fn list_timers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerListResponse>, ApiError> {
    let timers = state.list_timers().map_err(|e| {
        error!("Failed to list timers: {}", e);
        ApiError::internal(e)
    })?;

    Ok(Json(TimerListResponse {
        count: timers.len(),
        timers,
    }))
}

/// Handle GET /timers/:id - One timer's snapshot
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<HostedTimer>, ApiError> {
    let timer = find_timer(&state, id)?;
    Ok(Json(HostedTimer::new(id, timer.snapshot())))
}

/// Handle DELETE /timers/:id - Cancel a timer's ticks and forget it
pub async fn delete_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TimerResponse>, ApiError> {
    match state.remove_timer(id) {
        Ok(Some(hosted)) => Ok(Json(TimerResponse::ok(
            format!("Timer {} removed", id),
            hosted,
        ))),
        Ok(None) => Err(ApiError::not_found(id)),
        Err(e) => {
            error!("Failed to remove timer {}: {}", id, e);
            Err(ApiError::internal(e))
        }
    }
}

/// Handle POST /timers/:id/start
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TimerResponse>, ApiError> {
    control(&state, id, "start", |timer| Ok(timer.start()))
}

/// Handle POST /timers/:id/pause
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TimerResponse>, ApiError> {
    control(&state, id, "pause", Timer::pause)
}

/// Handle POST /timers/:id/resume
pub async fn resume_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TimerResponse>, ApiError> {
    control(&state, id, "resume", Timer::resume)
}

/// Handle POST /timers/:id/stop
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TimerResponse>, ApiError> {
    control(&state, id, "stop", |timer| Ok(timer.stop()))
}

/// Handle GET /status - Return current server status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let timers = state.list_timers().map_err(|e| {
        error!("Failed to get timers: {}", e);
        ApiError::internal(e)
    })?;
    let running = state.running_count().map_err(ApiError::internal)?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timers: timers.len(),
        running,
        tick_ms: state.tick_period.as_millis() as u64,
        default_countdown_seconds: state.default_countdown_seconds,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
