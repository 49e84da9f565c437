use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::controller::AppState;
use crate::domain::epoch_seconds_now;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    uptime_seconds: i64,
    checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    controller: ComponentHealth,
    feed: FeedHealth,
}

/// Health status of the control loop
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    running: bool,
    policy: &'static str,
    snapshots_published: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    loop_uptime_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_snapshot_age_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedHealth {
    observers: usize,
}

impl ComponentHealth {
    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// GET /health - Health check endpoint
///
/// 503 when the control loop is not running
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let controller_health = check_controller(&state);
    let all_healthy = controller_health.is_healthy();

    let now = chrono::Utc::now();
    let response = HealthResponse {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: now,
        uptime_seconds: (now - state.started_at).num_seconds(),
        checks: HealthChecks {
            controller: controller_health,
            feed: FeedHealth {
                observers: state.broadcaster.observer_count(),
            },
        },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(healthy = all_healthy, "Health check completed");
    (status_code, Json(response))
}

fn check_controller(state: &AppState) -> ComponentHealth {
    let running = state.supervisor.is_running();
    let last_snapshot_age_seconds = state
        .store
        .get()
        .map(|s| (epoch_seconds_now() - s.timestamp).max(0.0));

    ComponentHealth {
        status: if running { "healthy" } else { "unhealthy" }.to_string(),
        running,
        policy: state.policy.name(),
        snapshots_published: state.store.version(),
        loop_uptime_seconds: state.supervisor.uptime().map(|d| d.as_secs()),
        last_snapshot_age_seconds,
        error: (!running).then(|| "control loop is not running".to_string()),
    }
}

/// GET /health/live - Liveness check
///
/// Returns 200 if the process is serving requests
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
