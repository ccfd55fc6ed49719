//! Batch grading endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use workerlab_core::model::{Submission, TestCase, Verdict};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct GradeRequest {
    pub code: String,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GradeResponse {
    /// `true` when every verdict passed.
    pub passed: bool,
    pub verdicts: Vec<Verdict>,
}

/// POST /grade
pub async fn grade_submission(
    State(state): State<AppState>,
    payload: Result<Json<GradeRequest>, JsonRejection>,
) -> Result<Json<GradeResponse>, ApiError> {
    let Json(request) = payload?;
    let submission = Submission::new(request.code);

    let verdicts = state
        .coordinator
        .run_all(&submission, &request.tests)
        .await?;

    Ok(Json(GradeResponse {
        passed: verdicts.iter().all(|v| v.passed),
        verdicts,
    }))
}
