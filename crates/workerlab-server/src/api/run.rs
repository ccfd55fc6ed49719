//! Single-invocation endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use workerlab_core::model::{RequestSpec, RunOutcome, Submission};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub code: String,
    pub test_request: RequestSpec,
}

/// POST /run
pub async fn run_submission(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunOutcome>, ApiError> {
    let Json(request) = payload?;
    let submission = Submission::new(request.code);

    let result = state
        .coordinator
        .execute(&submission, &request.test_request)
        .await?;

    Ok(Json(RunOutcome::from(&result)))
}
