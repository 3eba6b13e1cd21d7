//! Timer event logging background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::{AppState, TimerEvent};

/// Background task that logs every event from every hosted timer
pub async fn event_logger_task(state: Arc<AppState>) {
    info!("Starting timer event logger");

    let mut events_rx = state.timer_event_tx.subscribe();

    loop {
        match events_rx.recv().await {
            Ok(notification) => match notification.event {
                TimerEvent::Times { value } => {
                    debug!("Timer {} at {}s", notification.timer_id, value);
                }
                TimerEvent::Pause { value } => {
                    info!("Timer {} paused at {}s", notification.timer_id, value);
                }
                TimerEvent::End => {
                    info!("Timer {} ended", notification.timer_id);
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event logger fell behind, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => {
                info!("Timer event channel closed, stopping event logger");
                break;
            }
        }
    }
}
