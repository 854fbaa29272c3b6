use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::AppError;
use crate::notify::{LeaderboardUpdated, Notifier, publish_best_effort};
use crate::store::{ProblemSummary, RankingEntry, Stores, SubmissionRecord};

/// Whether `candidate` should replace the submission kept so far for the
/// same (user, problem).
fn supersedes(candidate: &SubmissionRecord, kept: &SubmissionRecord) -> bool {
    candidate.status.is_accepted()
        && (!kept.status.is_accepted() || candidate.runtime_ms < kept.runtime_ms)
}

/// score desc, problems solved desc, runtime asc, then user id.
fn standing_order(a: &RankingEntry, b: &RankingEntry) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.problems_solved.cmp(&a.problems_solved))
        .then_with(|| a.total_runtime_ms.cmp(&b.total_runtime_ms))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Reduce a contest's submissions to ranked standings.
///
/// Input order does not matter; submissions are replayed oldest first. Each
/// user keeps one submission per problem: the first one seen, replaced by a
/// later accepted one that is the first accepted or strictly faster. Only
/// accepted kept submissions contribute points, solves and runtime, but every
/// user who submitted is ranked.
pub fn aggregate(submissions: &[SubmissionRecord]) -> Vec<RankingEntry> {
    let mut ordered: Vec<&SubmissionRecord> = submissions.iter().collect();
    ordered.sort_by_key(|s| (s.created_at, s.id));

    let mut kept: BTreeMap<(i32, i32), &SubmissionRecord> = BTreeMap::new();
    for sub in ordered {
        match kept.entry((sub.user_id, sub.problem_id)) {
            Entry::Vacant(slot) => {
                slot.insert(sub);
            }
            Entry::Occupied(mut slot) => {
                if supersedes(sub, slot.get()) {
                    slot.insert(sub);
                }
            }
        }
    }

    let mut by_user: BTreeMap<i32, Vec<&SubmissionRecord>> = BTreeMap::new();
    for ((user_id, _), sub) in kept {
        by_user.entry(user_id).or_default().push(sub);
    }

    let mut rankings: Vec<RankingEntry> = by_user
        .into_iter()
        .map(|(user_id, subs)| {
            let accepted = subs.iter().filter(|s| s.status.is_accepted());
            RankingEntry {
                user_id,
                rank: 0,
                score: accepted.clone().map(|s| s.score).sum(),
                problems_solved: accepted.clone().count() as u32,
                total_runtime_ms: accepted.map(|s| s.runtime_ms).sum(),
                problems: subs
                    .iter()
                    .map(|s| ProblemSummary {
                        problem_id: s.problem_id,
                        submission_id: s.id,
                        status: s.status,
                        score: s.score,
                        runtime_ms: s.runtime_ms,
                    })
                    .collect(),
            }
        })
        .collect();

    rankings.sort_by(standing_order);
    for (i, entry) in rankings.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }
    rankings
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardView {
    pub contest_id: i32,
    pub is_finalized: bool,
    pub rankings: Vec<RankingEntry>,
}

#[derive(Clone)]
pub struct LeaderboardService {
    stores: Stores,
    notifier: Arc<dyn Notifier>,
}

impl LeaderboardService {
    pub fn new(stores: Stores, notifier: Arc<dyn Notifier>) -> Self {
        Self { stores, notifier }
    }

    /// Finalized snapshot if there is one, otherwise standings computed on
    /// the spot. With `broadcast`, a live result is also pushed to the
    /// contest room in the background.
    #[instrument(skip(self))]
    pub async fn get_leaderboard(
        &self,
        contest_id: i32,
        broadcast: bool,
    ) -> Result<LeaderboardView, AppError> {
        self.stores
            .contests
            .find_contest(contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;

        if let Some(board) = self.stores.leaderboards.find_finalized(contest_id).await? {
            return Ok(LeaderboardView {
                contest_id,
                is_finalized: true,
                rankings: board.rankings,
            });
        }

        let submissions = self.stores.submissions.list_for_contest(contest_id).await?;
        let rankings = aggregate(&submissions);
        debug!(
            contest_id,
            submissions = submissions.len(),
            users = rankings.len(),
            "Computed live leaderboard"
        );

        if broadcast {
            let notifier = self.notifier.clone();
            let event = LeaderboardUpdated {
                contest_id,
                rankings: rankings.clone(),
            };
            tokio::spawn(async move {
                publish_best_effort(notifier.as_ref(), &event).await;
            });
        }

        Ok(LeaderboardView {
            contest_id,
            is_finalized: false,
            rankings,
        })
    }
}
