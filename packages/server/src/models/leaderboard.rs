use serde::{Deserialize, Serialize};

use crate::services::LeaderboardView;
use crate::store::{LeaderboardRecord, RankingEntry};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct LeaderboardQuery {
    /// Also push the live standings to the contest room.
    #[param(example = false)]
    #[serde(default)]
    pub broadcast: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardResponse {
    pub success: bool,
    #[schema(example = 3)]
    pub contest_id: i32,
    /// Frozen standings when true, computed on request otherwise.
    pub is_finalized: bool,
    pub rankings: Vec<RankingEntry>,
}

impl From<LeaderboardView> for LeaderboardResponse {
    fn from(view: LeaderboardView) -> Self {
        Self {
            success: true,
            contest_id: view.contest_id,
            is_finalized: view.is_finalized,
            rankings: view.rankings,
        }
    }
}

impl From<LeaderboardRecord> for LeaderboardResponse {
    fn from(board: LeaderboardRecord) -> Self {
        Self {
            success: true,
            contest_id: board.contest_id,
            is_finalized: board.is_finalized,
            rankings: board.rankings,
        }
    }
}
