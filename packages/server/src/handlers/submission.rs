use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::caller::Caller;
use crate::extractors::json::AppJson;
use crate::models::submission::*;
use crate::rate_limit::Decision;
use crate::services::SubmissionRequest;
use crate::state::AppState;

/// Count one request against the caller's window for `action`.
async fn enforce_rate_limit(state: &AppState, action: &str, user_id: i32) -> Result<(), AppError> {
    match state
        .rate_limiter
        .check(action, &user_id.to_string())
        .await
    {
        Decision::Allowed => Ok(()),
        Decision::Limited { retry_after_secs } => Err(AppError::RateLimited {
            retry_after: retry_after_secs,
        }),
    }
}

fn to_request(caller: &Caller, problem_id: i32, payload: SolutionRequest) -> SubmissionRequest {
    SubmissionRequest {
        user_id: caller.user_id,
        problem_id,
        contest_id: payload.contest_id,
        code: payload.code,
        language: payload.language,
    }
}

/// Judge a solution against the hidden test cases.
#[utoipa::path(
    post,
    path = "/{id}/submit",
    tag = "Submissions",
    operation_id = "submitSolution",
    summary = "Submit a solution",
    description = "Runs the code against every hidden test case, stores the graded submission and returns the verdict. Blocks until the sandbox has finished.",
    params(
        ("id" = i32, Path, description = "Problem ID")
    ),
    request_body = SolutionRequest,
    responses(
        (status = 200, description = "Submission judged", body = SubmitResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Problem or contest not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded (RATE_LIMITED)", body = ErrorBody),
        (status = 502, description = "Sandbox failure (JUDGE_UNAVAILABLE)", body = ErrorBody),
        (status = 503, description = "Sandbox throttling (JUDGE_RATE_LIMITED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, caller, payload), fields(user_id = caller.user_id, problem_id = %problem_id))]
pub async fn submit_solution(
    caller: Caller,
    State(state): State<AppState>,
    Path(problem_id): Path<i32>,
    AppJson(payload): AppJson<SolutionRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    enforce_rate_limit(&state, "submit", caller.user_id).await?;

    let report = state
        .submissions
        .submit(to_request(&caller, problem_id, payload))
        .await?;
    Ok(Json(report.into()))
}

/// Try a solution on the sample test cases.
#[utoipa::path(
    post,
    path = "/{id}/run",
    tag = "Submissions",
    operation_id = "runSolution",
    summary = "Run against samples",
    description = "Runs the code against the visible sample cases and reports every case. Nothing is stored except a short-lived copy of the report.",
    params(
        ("id" = i32, Path, description = "Problem ID")
    ),
    request_body = SolutionRequest,
    responses(
        (status = 200, description = "Run finished", body = RunResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Problem or contest not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded (RATE_LIMITED)", body = ErrorBody),
        (status = 502, description = "Sandbox failure (JUDGE_UNAVAILABLE)", body = ErrorBody),
        (status = 503, description = "Sandbox throttling (JUDGE_RATE_LIMITED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, caller, payload), fields(user_id = caller.user_id, problem_id = %problem_id))]
pub async fn run_solution(
    caller: Caller,
    State(state): State<AppState>,
    Path(problem_id): Path<i32>,
    AppJson(payload): AppJson<SolutionRequest>,
) -> Result<Json<RunResponse>, AppError> {
    enforce_rate_limit(&state, "run", caller.user_id).await?;

    let (run_id, report) = state
        .submissions
        .run(to_request(&caller, problem_id, payload))
        .await?;
    Ok(Json(RunResponse::new(run_id, report)))
}

/// Fetch a cached run report.
#[utoipa::path(
    get,
    path = "/{run_id}",
    tag = "Submissions",
    operation_id = "getRun",
    summary = "Get a run report",
    params(
        ("run_id" = String, Path, description = "Run ID returned by the run endpoint")
    ),
    responses(
        (status = 200, description = "Run report", body = RunResponse),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Unknown, expired or someone else's run (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, caller), fields(user_id = caller.user_id))]
pub async fn get_run(
    caller: Caller,
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunResponse>, AppError> {
    let report = state
        .submissions
        .get_run(&run_id, caller.user_id)
        .ok_or_else(|| AppError::NotFound("Run not found or expired".into()))?;
    Ok(Json(RunResponse::new(run_id, report)))
}
