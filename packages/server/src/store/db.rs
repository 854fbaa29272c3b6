use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::{
    ContestHistoryEntry, ContestRecord, ContestStore, LeaderboardRecord, LeaderboardStore,
    NewSubmission, ProblemRecord, ProblemStore, RankingEntry, StoreResult, SubmissionOutcome,
    SubmissionRecord, SubmissionStore, TestCase, UserStore, UserStreak,
};
use crate::entity::{
    contest, leaderboard, problem, submission, test_case, user_completed_contest,
    user_contest_history, user_solved_problem, user_stats,
};

/// Postgres-backed store.
#[derive(Clone)]
pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// An insert with `ON CONFLICT DO NOTHING` reports a skipped row either as
/// zero rows affected or as `RecordNotInserted`, depending on the backend.
fn inserted(result: Result<u64, DbErr>) -> Result<bool, DbErr> {
    match result {
        Ok(rows) => Ok(rows > 0),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Statuses from which `next` is a forward move.
fn predecessors(next: SubmissionStatus) -> Vec<SubmissionStatus> {
    SubmissionStatus::ALL
        .iter()
        .copied()
        .filter(|s| s.can_advance_to(next))
        .collect()
}

impl From<contest::Model> for ContestRecord {
    fn from(m: contest::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            start_time: m.start_time,
            end_time: m.end_time,
        }
    }
}

impl From<test_case::Model> for TestCase {
    fn from(m: test_case::Model) -> Self {
        Self {
            id: m.id,
            input: m.input,
            expected_output: m.expected_output,
        }
    }
}

impl From<submission::Model> for SubmissionRecord {
    fn from(m: submission::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            problem_id: m.problem_id,
            contest_id: m.contest_id,
            code: m.code,
            language: m.language,
            status: m.status,
            test_cases_passed: m.test_cases_passed,
            total_test_cases: m.total_test_cases,
            runtime_ms: m.runtime_ms,
            memory_kb: m.memory_kb,
            error_message: m.error_message,
            score: m.score,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<user_contest_history::Model> for ContestHistoryEntry {
    fn from(m: user_contest_history::Model) -> Self {
        Self {
            contest_id: m.contest_id,
            rank: m.rank.max(0) as u32,
            score: m.score,
            problems_solved: m.problems_solved.max(0) as u32,
            total_runtime_ms: m.total_runtime_ms,
            finalized_at: m.finalized_at,
        }
    }
}

fn leaderboard_record(m: leaderboard::Model) -> StoreResult<LeaderboardRecord> {
    Ok(LeaderboardRecord {
        id: m.id,
        contest_id: m.contest_id,
        rankings: serde_json::from_value(m.rankings)?,
        is_finalized: m.is_finalized,
        created_at: m.created_at,
    })
}

#[async_trait]
impl ProblemStore for DbStore {
    async fn find_problem(&self, id: i32) -> StoreResult<Option<ProblemRecord>> {
        let Some(problem) = problem::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let cases = test_case::Entity::find()
            .filter(test_case::Column::ProblemId.eq(id))
            .order_by_asc(test_case::Column::Position)
            .order_by_asc(test_case::Column::Id)
            .all(&self.db)
            .await?;

        let (visible, hidden): (Vec<_>, Vec<_>) = cases.into_iter().partition(|tc| tc.is_sample);

        Ok(Some(ProblemRecord {
            id: problem.id,
            title: problem.title,
            difficulty: problem.difficulty,
            visible_cases: visible.into_iter().map(TestCase::from).collect(),
            hidden_cases: hidden.into_iter().map(TestCase::from).collect(),
        }))
    }
}

#[async_trait]
impl ContestStore for DbStore {
    async fn find_contest(&self, id: i32) -> StoreResult<Option<ContestRecord>> {
        Ok(contest::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(ContestRecord::from))
    }

    async fn list_ended_unfinalized(&self, now: DateTime<Utc>) -> StoreResult<Vec<ContestRecord>> {
        let finalized: Vec<i32> = leaderboard::Entity::find()
            .select_only()
            .column(leaderboard::Column::ContestId)
            .filter(leaderboard::Column::IsFinalized.eq(true))
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut query = contest::Entity::find()
            .filter(contest::Column::EndTime.lte(now))
            .order_by_asc(contest::Column::Id);
        if !finalized.is_empty() {
            query = query.filter(contest::Column::Id.is_not_in(finalized));
        }

        Ok(query
            .all(&self.db)
            .await?
            .into_iter()
            .map(ContestRecord::from)
            .collect())
    }
}

#[async_trait]
impl SubmissionStore for DbStore {
    async fn create_pending(&self, new: NewSubmission) -> StoreResult<SubmissionRecord> {
        let now = Utc::now();
        let model = submission::ActiveModel {
            code: Set(new.code),
            language: Set(new.language),
            status: Set(SubmissionStatus::Pending),
            test_cases_passed: Set(0),
            total_test_cases: Set(new.total_test_cases),
            runtime_ms: Set(0),
            memory_kb: Set(0),
            error_message: Set(None),
            score: Set(0.0),
            user_id: Set(new.user_id),
            problem_id: Set(new.problem_id),
            contest_id: Set(new.contest_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    async fn advance_status(&self, id: i32, status: SubmissionStatus) -> StoreResult<bool> {
        let from = predecessors(status);
        if from.is_empty() {
            return Ok(false);
        }

        let result = submission::Entity::update_many()
            .col_expr(submission::Column::Status, Expr::value(status))
            .col_expr(submission::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(submission::Column::Id.eq(id))
            .filter(submission::Column::Status.is_in(from))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn complete(&self, id: i32, outcome: &SubmissionOutcome) -> StoreResult<bool> {
        let from = predecessors(outcome.status);
        if from.is_empty() {
            return Ok(false);
        }

        let result = submission::Entity::update_many()
            .col_expr(submission::Column::Status, Expr::value(outcome.status))
            .col_expr(
                submission::Column::TestCasesPassed,
                Expr::value(outcome.test_cases_passed),
            )
            .col_expr(
                submission::Column::TotalTestCases,
                Expr::value(outcome.total_test_cases),
            )
            .col_expr(submission::Column::RuntimeMs, Expr::value(outcome.runtime_ms))
            .col_expr(submission::Column::MemoryKb, Expr::value(outcome.memory_kb))
            .col_expr(
                submission::Column::ErrorMessage,
                Expr::value(outcome.error_message.clone()),
            )
            .col_expr(submission::Column::Score, Expr::value(outcome.score))
            .col_expr(submission::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(submission::Column::Id.eq(id))
            .filter(submission::Column::Status.is_in(from))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn find_submission(&self, id: i32) -> StoreResult<Option<SubmissionRecord>> {
        Ok(submission::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(SubmissionRecord::from))
    }

    async fn list_for_contest(&self, contest_id: i32) -> StoreResult<Vec<SubmissionRecord>> {
        Ok(submission::Entity::find()
            .filter(submission::Column::ContestId.eq(contest_id))
            .order_by_asc(submission::Column::CreatedAt)
            .order_by_asc(submission::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(SubmissionRecord::from)
            .collect())
    }
}

#[async_trait]
impl LeaderboardStore for DbStore {
    async fn find_finalized(&self, contest_id: i32) -> StoreResult<Option<LeaderboardRecord>> {
        leaderboard::Entity::find()
            .filter(leaderboard::Column::ContestId.eq(contest_id))
            .filter(leaderboard::Column::IsFinalized.eq(true))
            .one(&self.db)
            .await?
            .map(leaderboard_record)
            .transpose()
    }

    async fn insert_finalized(
        &self,
        contest_id: i32,
        rankings: &[RankingEntry],
    ) -> StoreResult<Option<LeaderboardRecord>> {
        let row = leaderboard::ActiveModel {
            contest_id: Set(contest_id),
            rankings: Set(serde_json::to_value(rankings)?),
            is_finalized: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        // The unique index on contest_id makes this the single arbiter
        // between concurrent finalizers.
        let won = inserted(
            leaderboard::Entity::insert(row)
                .on_conflict(
                    OnConflict::column(leaderboard::Column::ContestId)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await,
        )?;

        if !won {
            return Ok(None);
        }
        self.find_finalized(contest_id).await
    }
}

#[async_trait]
impl UserStore for DbStore {
    async fn add_solved_problem(&self, user_id: i32, problem_id: i32) -> StoreResult<bool> {
        let row = user_solved_problem::ActiveModel {
            user_id: Set(user_id),
            problem_id: Set(problem_id),
            solved_at: Set(Utc::now()),
        };
        Ok(inserted(
            user_solved_problem::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        user_solved_problem::Column::UserId,
                        user_solved_problem::Column::ProblemId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await,
        )?)
    }

    async fn solved_problems(&self, user_id: i32) -> StoreResult<Vec<i32>> {
        Ok(user_solved_problem::Entity::find()
            .select_only()
            .column(user_solved_problem::Column::ProblemId)
            .filter(user_solved_problem::Column::UserId.eq(user_id))
            .order_by_asc(user_solved_problem::Column::ProblemId)
            .into_tuple()
            .all(&self.db)
            .await?)
    }

    async fn find_streak(&self, user_id: i32) -> StoreResult<Option<UserStreak>> {
        Ok(user_stats::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .map(|m| UserStreak {
                streak: m.streak.max(0) as u32,
                last_completed_at: m.last_completed_at,
            }))
    }

    async fn save_streak(&self, user_id: i32, streak: &UserStreak) -> StoreResult<()> {
        let row = user_stats::ActiveModel {
            user_id: Set(user_id),
            streak: Set(streak.streak as i32),
            last_completed_at: Set(streak.last_completed_at),
        };
        user_stats::Entity::insert(row)
            .on_conflict(
                OnConflict::column(user_stats::Column::UserId)
                    .update_columns([
                        user_stats::Column::Streak,
                        user_stats::Column::LastCompletedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn upsert_contest_history(
        &self,
        user_id: i32,
        entry: &ContestHistoryEntry,
    ) -> StoreResult<()> {
        let row = user_contest_history::ActiveModel {
            user_id: Set(user_id),
            contest_id: Set(entry.contest_id),
            rank: Set(entry.rank as i32),
            score: Set(entry.score),
            problems_solved: Set(entry.problems_solved as i32),
            total_runtime_ms: Set(entry.total_runtime_ms),
            finalized_at: Set(entry.finalized_at),
        };
        user_contest_history::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    user_contest_history::Column::UserId,
                    user_contest_history::Column::ContestId,
                ])
                .update_columns([
                    user_contest_history::Column::Rank,
                    user_contest_history::Column::Score,
                    user_contest_history::Column::ProblemsSolved,
                    user_contest_history::Column::TotalRuntimeMs,
                    user_contest_history::Column::FinalizedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn contest_history(&self, user_id: i32) -> StoreResult<Vec<ContestHistoryEntry>> {
        Ok(user_contest_history::Entity::find()
            .filter(user_contest_history::Column::UserId.eq(user_id))
            .order_by_asc(user_contest_history::Column::ContestId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ContestHistoryEntry::from)
            .collect())
    }

    async fn add_completed_contest(&self, user_id: i32, contest_id: i32) -> StoreResult<bool> {
        let row = user_completed_contest::ActiveModel {
            user_id: Set(user_id),
            contest_id: Set(contest_id),
            completed_at: Set(Utc::now()),
        };
        Ok(inserted(
            user_completed_contest::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        user_completed_contest::Column::UserId,
                        user_completed_contest::Column::ContestId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await,
        )?)
    }

    async fn completed_contests(&self, user_id: i32) -> StoreResult<Vec<i32>> {
        Ok(user_completed_contest::Entity::find()
            .select_only()
            .column(user_completed_contest::Column::ContestId)
            .filter(user_completed_contest::Column::UserId.eq(user_id))
            .order_by_asc(user_completed_contest::Column::ContestId)
            .into_tuple()
            .all(&self.db)
            .await?)
    }
}
