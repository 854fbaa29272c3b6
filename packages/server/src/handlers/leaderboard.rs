use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::caller::Caller;
use crate::models::leaderboard::*;
use crate::state::AppState;

/// Contest standings.
#[utoipa::path(
    get,
    path = "/{id}/leaderboard",
    tag = "Leaderboards",
    operation_id = "getLeaderboard",
    summary = "Get contest leaderboard",
    description = "Returns the frozen leaderboard of a finalized contest, or standings computed from the current submissions otherwise.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        LeaderboardQuery,
    ),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardResponse),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let view = state
        .leaderboards
        .get_leaderboard(id, query.broadcast)
        .await?;
    Ok(Json(view.into()))
}

/// Freeze a finished contest's leaderboard.
#[utoipa::path(
    post,
    path = "/{id}/finalize",
    tag = "Leaderboards",
    operation_id = "finalizeContest",
    summary = "Finalize contest leaderboard",
    description = "Computes and stores the final standings of an ended contest and updates each participant's history and streak. Admin only; runs once per contest.",
    params(
        ("id" = i32, Path, description = "Contest ID")
    ),
    responses(
        (status = 200, description = "Finalized leaderboard", body = LeaderboardResponse),
        (status = 400, description = "Contest still running or already finalized (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 403, description = "Not an admin (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, caller), fields(user_id = caller.user_id))]
pub async fn finalize_contest(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    caller.require_admin()?;

    let board = state.finalizer.finalize_contest_manually(id).await?;
    Ok(Json(board.into()))
}
