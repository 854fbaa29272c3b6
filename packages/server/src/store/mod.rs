//! Narrow persistence interfaces the engine depends on.
//!
//! [`DbStore`] backs them with Postgres through sea-orm; [`MemoryStore`]
//! keeps everything in process for tests and local runs.

pub mod db;
pub mod memory;
pub mod records;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use sea_orm::DbErr;
use thiserror::Error;

pub use db::DbStore;
pub use memory::MemoryStore;
pub use records::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handles to every store, usually all backed by the same object.
#[derive(Clone)]
pub struct Stores {
    pub problems: Arc<dyn ProblemStore>,
    pub contests: Arc<dyn ContestStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub leaderboards: Arc<dyn LeaderboardStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ProblemStore + ContestStore + SubmissionStore + LeaderboardStore + UserStore + 'static,
    {
        Self {
            problems: store.clone(),
            contests: store.clone(),
            submissions: store.clone(),
            leaderboards: store.clone(),
            users: store,
        }
    }
}

/// Read-only access to problems and their test cases.
#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn find_problem(&self, id: i32) -> StoreResult<Option<ProblemRecord>>;
}

#[async_trait]
pub trait ContestStore: Send + Sync {
    async fn find_contest(&self, id: i32) -> StoreResult<Option<ContestRecord>>;

    /// Contests whose end time is at or before `now` and that have no
    /// finalized leaderboard yet.
    async fn list_ended_unfinalized(&self, now: DateTime<Utc>) -> StoreResult<Vec<ContestRecord>>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create_pending(&self, new: NewSubmission) -> StoreResult<SubmissionRecord>;

    /// Move a submission to `status` if that is a forward transition.
    ///
    /// Returns `false` when the row is missing or already past `status`.
    async fn advance_status(&self, id: i32, status: SubmissionStatus) -> StoreResult<bool>;

    /// Record the judged outcome. Same forward-only rule as `advance_status`.
    async fn complete(&self, id: i32, outcome: &SubmissionOutcome) -> StoreResult<bool>;

    async fn find_submission(&self, id: i32) -> StoreResult<Option<SubmissionRecord>>;

    /// Every submission tied to a contest, oldest first (ties by id).
    async fn list_for_contest(&self, contest_id: i32) -> StoreResult<Vec<SubmissionRecord>>;
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    async fn find_finalized(&self, contest_id: i32) -> StoreResult<Option<LeaderboardRecord>>;

    /// Persist a finalized leaderboard unless one already exists.
    ///
    /// The check and the write are a single atomic step; `None` means another
    /// caller finalized the contest first.
    async fn insert_finalized(
        &self,
        contest_id: i32,
        rankings: &[RankingEntry],
    ) -> StoreResult<Option<LeaderboardRecord>>;
}

/// Engine-owned user state: solved problems, streaks, contest history.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns `true` if the problem was not solved before.
    async fn add_solved_problem(&self, user_id: i32, problem_id: i32) -> StoreResult<bool>;

    async fn solved_problems(&self, user_id: i32) -> StoreResult<Vec<i32>>;

    async fn find_streak(&self, user_id: i32) -> StoreResult<Option<UserStreak>>;

    async fn save_streak(&self, user_id: i32, streak: &UserStreak) -> StoreResult<()>;

    /// Insert or overwrite the history entry for `entry.contest_id`.
    async fn upsert_contest_history(
        &self,
        user_id: i32,
        entry: &ContestHistoryEntry,
    ) -> StoreResult<()>;

    async fn contest_history(&self, user_id: i32) -> StoreResult<Vec<ContestHistoryEntry>>;

    /// Returns `true` if the contest was not in the completed set before.
    async fn add_completed_contest(&self, user_id: i32, contest_id: i32) -> StoreResult<bool>;

    async fn completed_contests(&self, user_id: i32) -> StoreResult<Vec<i32>>;
}
