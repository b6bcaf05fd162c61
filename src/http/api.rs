use core::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::app::{self, AppState, ConnectionStatus, FeedChoice, Snapshot};

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/monitoring/start", post(start_monitoring))
        .route("/monitoring/stop", post(stop_monitoring))
        .route("/monitoring/toggle", post(toggle_monitoring))
        .route("/feed/toggle", post(toggle_feed))
        .route("/outage/simulate", post(simulate_outage))
        .route("/connection/reset", post(reset_connection))
}

#[derive(Serialize)]
struct MonitoringStarted {
    already_running: bool,
}

#[derive(Serialize)]
struct MonitoringState {
    running: bool,
}

#[derive(Serialize)]
struct FeedState {
    active_feed: FeedChoice,
}

/// Connection-state summary returned by the override endpoints.
#[derive(Serialize)]
struct ConnectionSummary {
    status: ConnectionStatus,
    active_feed: FeedChoice,
}

impl From<Snapshot> for ConnectionSummary {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            status: snapshot.status,
            active_feed: snapshot.active_feed,
        }
    }
}

/// Parameters for the simulated-outage endpoint.
#[derive(Deserialize)]
struct SimulateParams {
    /// Length of the suppression window; falls back to the configured default.
    duration_secs: Option<u64>,
    /// Free-form reason recorded with the window.
    reason: Option<String>,
}

/// Returns the current session snapshot as JSON.
#[axum::debug_handler]
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.session.snapshot())
}

/// Starts the connection watchdog. Calling it while running is a no-op,
/// reported via `already_running`.
#[axum::debug_handler]
async fn start_monitoring(State(state): State<AppState>) -> impl IntoResponse {
    let already_running = app::start_monitoring(
        &state.session,
        state.probe.clone(),
        state.config.monitor.clone(),
    )
    .await;
    axum::Json(MonitoringStarted { already_running })
}

#[axum::debug_handler]
async fn stop_monitoring(State(state): State<AppState>) -> impl IntoResponse {
    app::stop_monitoring(&state.session).await;
    StatusCode::NO_CONTENT
}

#[axum::debug_handler]
async fn toggle_monitoring(State(state): State<AppState>) -> impl IntoResponse {
    let running = app::toggle_monitoring(
        &state.session,
        state.probe.clone(),
        state.config.monitor.clone(),
    )
    .await;
    axum::Json(MonitoringState { running })
}

/// Manually flips the active feed. The override lasts until the next
/// unsuppressed watchdog tick realigns the feed with the connection status.
#[axum::debug_handler]
async fn toggle_feed(State(state): State<AppState>) -> impl IntoResponse {
    let active_feed = state.session.toggle_feed().await;
    axum::Json(FeedState { active_feed })
}

/// Simulates a poor connection for the requested duration, pinning the feed
/// to backup and suppressing the watchdog until the window expires.
#[axum::debug_handler]
async fn simulate_outage(
    State(state): State<AppState>,
    Query(params): Query<SimulateParams>,
) -> impl IntoResponse {
    let duration = Duration::from_secs(
        params
            .duration_secs
            .unwrap_or(state.config.outage.default_duration_secs),
    );
    let reason = params
        .reason
        .as_deref()
        .unwrap_or("simulated poor connection");
    let snapshot = app::trigger_outage(&state.session, reason, duration).await;
    axum::Json(ConnectionSummary::from(snapshot))
}

/// Clears any active override and resets the connection to stable.
#[axum::debug_handler]
async fn reset_connection(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.session.reset_connection().await;
    axum::Json(ConnectionSummary::from(snapshot))
}
