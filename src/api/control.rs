use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::error::ApiError,
    controller::AppState,
    domain::{self, Action},
};

/// Body of `/init` and `/get-action`: `{"state": [temperature, ac, window]}`
#[derive(Debug, Deserialize, Validate)]
pub struct StateRequest {
    #[validate(length(equal = 3, message = "state must have exactly 3 elements"))]
    pub state: Vec<f64>,
}

impl StateRequest {
    fn into_state(self) -> Result<domain::State, ApiError> {
        self.validate()?;
        Ok(domain::State::from_vector(&self.state)?)
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub message: &'static str,
    pub state: [f64; 3],
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub action: Action,
    pub index: usize,
    pub message: &'static str,
}

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "AC Window Controller API is running!",
    })
}

/// POST /init - restart the control loop from the given state
pub async fn init(
    State(st): State<AppState>,
    body: Result<Json<StateRequest>, JsonRejection>,
) -> Result<Json<InitResponse>, ApiError> {
    let Json(request) = body?;
    let state = request.into_state()?;

    let initial = st.supervisor.restart(state).await?;
    tracing::info!(
        indoor_temp_c = initial.indoor_temperature,
        ac_status = initial.ac_status,
        window_status = initial.window_status,
        "environment initialised"
    );

    Ok(Json(InitResponse {
        message: "Environment initialized and simulation started.",
        state: initial.to_vector(),
    }))
}

/// POST /get-action - ask the policy without stepping the environment
pub async fn get_action(
    State(st): State<AppState>,
    body: Result<Json<StateRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Json(request) = body?;
    let state = request.into_state()?;

    let index = st.policy.decide(&state);
    let action = st.catalog.get(index).ok_or_else(|| {
        ApiError::InternalError(format!(
            "policy {} returned index {index} outside the catalog",
            st.policy.name()
        ))
    })?;

    Ok(Json(ActionResponse {
        action,
        index,
        message: "Action computed successfully.",
    }))
}

/// GET /snapshot - latest published snapshot, 204 before the first cycle
pub async fn latest_snapshot(State(st): State<AppState>) -> Response {
    match st.store.get() {
        Some(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
