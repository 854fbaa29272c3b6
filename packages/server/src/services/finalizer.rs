use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::Room;
use tracing::{error, info, instrument, warn};

use super::leaderboard::aggregate;
use crate::config::FinalizerConfig;
use crate::error::AppError;
use crate::notify::{LeaderboardFinalized, Notifier, Standing, publish_best_effort};
use crate::store::{ContestHistoryEntry, LeaderboardRecord, RankingEntry, Stores, UserStreak};

/// Result of one attempt to freeze a contest.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// This call wrote the leaderboard and propagated it.
    Finalized(LeaderboardRecord),
    /// A finalized leaderboard already existed or another caller won the race.
    AlreadyFinalized,
}

/// Streak after completing a contest at `now`, counted in UTC days.
pub fn next_streak(current: Option<UserStreak>, now: DateTime<Utc>) -> UserStreak {
    let today = now.date_naive();
    let last_day = current
        .and_then(|s| s.last_completed_at)
        .map(|t| t.date_naive());

    match (current, last_day) {
        (Some(s), Some(day)) if day == today => s,
        (Some(s), Some(day)) if today.pred_opt() == Some(day) => UserStreak {
            streak: s.streak + 1,
            last_completed_at: Some(now),
        },
        _ => UserStreak {
            streak: 1,
            last_completed_at: Some(now),
        },
    }
}

/// Freezes contest leaderboards once their contests end.
#[derive(Clone)]
pub struct Finalizer {
    stores: Stores,
    notifier: Arc<dyn Notifier>,
}

impl Finalizer {
    pub fn new(stores: Stores, notifier: Arc<dyn Notifier>) -> Self {
        Self { stores, notifier }
    }

    /// Compute and persist the final standings unless that already happened.
    ///
    /// Only the caller whose insert lands updates user history and sends
    /// notifications, so concurrent calls propagate at most once.
    #[instrument(skip(self))]
    pub async fn finalize_contest(&self, contest_id: i32) -> Result<FinalizeOutcome, AppError> {
        if self
            .stores
            .leaderboards
            .find_finalized(contest_id)
            .await?
            .is_some()
        {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        let submissions = self.stores.submissions.list_for_contest(contest_id).await?;
        let rankings = aggregate(&submissions);

        let Some(board) = self
            .stores
            .leaderboards
            .insert_finalized(contest_id, &rankings)
            .await?
        else {
            info!(contest_id, "Contest finalized concurrently, skipping propagation");
            return Ok(FinalizeOutcome::AlreadyFinalized);
        };

        info!(
            contest_id,
            users = board.rankings.len(),
            "Leaderboard finalized"
        );

        for entry in &board.rankings {
            if let Err(e) = self.propagate(contest_id, entry, board.created_at).await {
                error!(
                    contest_id,
                    user_id = entry.user_id,
                    error = ?e,
                    "Failed to record final standing"
                );
            }
        }

        publish_best_effort(
            self.notifier.as_ref(),
            &LeaderboardFinalized {
                contest_id,
                audience: Room::Contest(contest_id),
                standing: None,
            },
        )
        .await;

        Ok(FinalizeOutcome::Finalized(board))
    }

    /// Administrative finalize. Unlike the sweep, refusing is an error.
    #[instrument(skip(self))]
    pub async fn finalize_contest_manually(
        &self,
        contest_id: i32,
    ) -> Result<LeaderboardRecord, AppError> {
        let contest = self
            .stores
            .contests
            .find_contest(contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;

        if !contest.has_ended_at(Utc::now()) {
            return Err(AppError::Validation("Contest has not ended yet".into()));
        }

        match self.finalize_contest(contest_id).await? {
            FinalizeOutcome::Finalized(board) => Ok(board),
            FinalizeOutcome::AlreadyFinalized => Err(AppError::Validation(
                "Contest leaderboard is already finalized".into(),
            )),
        }
    }

    /// Finalize every ended contest that is still open. Returns how many
    /// this pass finalized.
    pub async fn sweep(&self) -> Result<usize, AppError> {
        let due = self
            .stores
            .contests
            .list_ended_unfinalized(Utc::now())
            .await?;

        let mut finalized = 0;
        for contest in due {
            match self.finalize_contest(contest.id).await {
                Ok(FinalizeOutcome::Finalized(_)) => finalized += 1,
                Ok(FinalizeOutcome::AlreadyFinalized) => {}
                Err(e) => {
                    warn!(contest_id = contest.id, error = ?e, "Failed to finalize contest");
                }
            }
        }
        Ok(finalized)
    }

    async fn propagate(
        &self,
        contest_id: i32,
        entry: &RankingEntry,
        finalized_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let users = &self.stores.users;
        let user_id = entry.user_id;

        users
            .upsert_contest_history(
                user_id,
                &ContestHistoryEntry {
                    contest_id,
                    rank: entry.rank,
                    score: entry.score,
                    problems_solved: entry.problems_solved,
                    total_runtime_ms: entry.total_runtime_ms,
                    finalized_at,
                },
            )
            .await?;

        let current = users.find_streak(user_id).await?;
        let streak = next_streak(current, finalized_at);
        if current != Some(streak) {
            users.save_streak(user_id, &streak).await?;
        }

        users.add_completed_contest(user_id, contest_id).await?;

        publish_best_effort(
            self.notifier.as_ref(),
            &LeaderboardFinalized {
                contest_id,
                audience: Room::User(user_id),
                standing: Some(Standing {
                    rank: entry.rank,
                    score: entry.score,
                    problems_solved: entry.problems_solved,
                    streak: streak.streak,
                }),
            },
        )
        .await;
        Ok(())
    }
}

/// Run the finalizer sweep as a background task.
pub async fn run_finalizer_sweep(finalizer: Finalizer, config: FinalizerConfig) {
    info!(
        interval_secs = config.sweep_interval_secs,
        "Starting leaderboard finalizer"
    );

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.sweep_interval_secs.max(1)));

    loop {
        interval.tick().await;

        match finalizer.sweep().await {
            Ok(0) => {}
            Ok(count) => info!(count, "Finalized ended contests"),
            Err(e) => error!(error = ?e, "Finalizer sweep failed"),
        }
    }
}
