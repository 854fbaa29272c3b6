use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use tokio::sync::Mutex;

use super::{
    ContestHistoryEntry, ContestRecord, ContestStore, LeaderboardRecord, LeaderboardStore,
    NewSubmission, ProblemRecord, ProblemStore, RankingEntry, StoreResult, SubmissionOutcome,
    SubmissionRecord, SubmissionStore, UserStore, UserStreak,
};

#[derive(Default)]
struct State {
    problems: HashMap<i32, ProblemRecord>,
    contests: HashMap<i32, ContestRecord>,
    submissions: BTreeMap<i32, SubmissionRecord>,
    next_submission_id: i32,
    /// Keyed by contest id.
    leaderboards: HashMap<i32, LeaderboardRecord>,
    next_leaderboard_id: i32,
    solved: BTreeSet<(i32, i32)>,
    streaks: HashMap<i32, UserStreak>,
    history: BTreeMap<(i32, i32), ContestHistoryEntry>,
    completed: BTreeSet<(i32, i32)>,
}

/// Process-local store. Every operation holds one lock, so the atomicity the
/// traits promise comes for free.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_problem(&self, problem: ProblemRecord) {
        self.state.lock().await.problems.insert(problem.id, problem);
    }

    pub async fn insert_contest(&self, contest: ContestRecord) {
        self.state.lock().await.contests.insert(contest.id, contest);
    }

    /// Insert a submission with explicit fields, bypassing the lifecycle.
    /// Useful for replaying history into a contest.
    pub async fn insert_submission(&self, mut record: SubmissionRecord) -> SubmissionRecord {
        let mut state = self.state.lock().await;
        state.next_submission_id = state.next_submission_id.max(record.id);
        if record.id == 0 {
            state.next_submission_id += 1;
            record.id = state.next_submission_id;
        }
        state.submissions.insert(record.id, record.clone());
        record
    }
}

fn apply_outcome(record: &mut SubmissionRecord, outcome: &SubmissionOutcome, now: DateTime<Utc>) {
    record.status = outcome.status;
    record.test_cases_passed = outcome.test_cases_passed;
    record.total_test_cases = outcome.total_test_cases;
    record.runtime_ms = outcome.runtime_ms;
    record.memory_kb = outcome.memory_kb;
    record.error_message = outcome.error_message.clone();
    record.score = outcome.score;
    record.updated_at = now;
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn find_problem(&self, id: i32) -> StoreResult<Option<ProblemRecord>> {
        Ok(self.state.lock().await.problems.get(&id).cloned())
    }
}

#[async_trait]
impl ContestStore for MemoryStore {
    async fn find_contest(&self, id: i32) -> StoreResult<Option<ContestRecord>> {
        Ok(self.state.lock().await.contests.get(&id).cloned())
    }

    async fn list_ended_unfinalized(&self, now: DateTime<Utc>) -> StoreResult<Vec<ContestRecord>> {
        let state = self.state.lock().await;
        let mut contests: Vec<_> = state
            .contests
            .values()
            .filter(|c| c.has_ended_at(now))
            .filter(|c| {
                !state
                    .leaderboards
                    .get(&c.id)
                    .is_some_and(|lb| lb.is_finalized)
            })
            .cloned()
            .collect();
        contests.sort_by_key(|c| c.id);
        Ok(contests)
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create_pending(&self, new: NewSubmission) -> StoreResult<SubmissionRecord> {
        let mut state = self.state.lock().await;
        state.next_submission_id += 1;
        let now = Utc::now();
        let record = SubmissionRecord {
            id: state.next_submission_id,
            user_id: new.user_id,
            problem_id: new.problem_id,
            contest_id: new.contest_id,
            code: new.code,
            language: new.language,
            status: SubmissionStatus::Pending,
            test_cases_passed: 0,
            total_test_cases: new.total_test_cases,
            runtime_ms: 0,
            memory_kb: 0,
            error_message: None,
            score: 0.0,
            created_at: now,
            updated_at: now,
        };
        state.submissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn advance_status(&self, id: i32, status: SubmissionStatus) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.submissions.get_mut(&id) {
            Some(record) if record.status.can_advance_to(status) => {
                record.status = status;
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, id: i32, outcome: &SubmissionOutcome) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.submissions.get_mut(&id) {
            Some(record) if record.status.can_advance_to(outcome.status) => {
                apply_outcome(record, outcome, Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_submission(&self, id: i32) -> StoreResult<Option<SubmissionRecord>> {
        Ok(self.state.lock().await.submissions.get(&id).cloned())
    }

    async fn list_for_contest(&self, contest_id: i32) -> StoreResult<Vec<SubmissionRecord>> {
        let state = self.state.lock().await;
        let mut submissions: Vec<_> = state
            .submissions
            .values()
            .filter(|s| s.contest_id == Some(contest_id))
            .cloned()
            .collect();
        submissions.sort_by_key(|s| (s.created_at, s.id));
        Ok(submissions)
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStore {
    async fn find_finalized(&self, contest_id: i32) -> StoreResult<Option<LeaderboardRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .leaderboards
            .get(&contest_id)
            .filter(|lb| lb.is_finalized)
            .cloned())
    }

    async fn insert_finalized(
        &self,
        contest_id: i32,
        rankings: &[RankingEntry],
    ) -> StoreResult<Option<LeaderboardRecord>> {
        let mut state = self.state.lock().await;
        if state.leaderboards.contains_key(&contest_id) {
            return Ok(None);
        }
        state.next_leaderboard_id += 1;
        let record = LeaderboardRecord {
            id: state.next_leaderboard_id,
            contest_id,
            rankings: rankings.to_vec(),
            is_finalized: true,
            created_at: Utc::now(),
        };
        state.leaderboards.insert(contest_id, record.clone());
        Ok(Some(record))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn add_solved_problem(&self, user_id: i32, problem_id: i32) -> StoreResult<bool> {
        Ok(self.state.lock().await.solved.insert((user_id, problem_id)))
    }

    async fn solved_problems(&self, user_id: i32) -> StoreResult<Vec<i32>> {
        let state = self.state.lock().await;
        Ok(state
            .solved
            .range((user_id, i32::MIN)..=(user_id, i32::MAX))
            .map(|&(_, problem_id)| problem_id)
            .collect())
    }

    async fn find_streak(&self, user_id: i32) -> StoreResult<Option<UserStreak>> {
        Ok(self.state.lock().await.streaks.get(&user_id).copied())
    }

    async fn save_streak(&self, user_id: i32, streak: &UserStreak) -> StoreResult<()> {
        self.state.lock().await.streaks.insert(user_id, *streak);
        Ok(())
    }

    async fn upsert_contest_history(
        &self,
        user_id: i32,
        entry: &ContestHistoryEntry,
    ) -> StoreResult<()> {
        self.state
            .lock()
            .await
            .history
            .insert((user_id, entry.contest_id), entry.clone());
        Ok(())
    }

    async fn contest_history(&self, user_id: i32) -> StoreResult<Vec<ContestHistoryEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .range((user_id, i32::MIN)..=(user_id, i32::MAX))
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn add_completed_contest(&self, user_id: i32, contest_id: i32) -> StoreResult<bool> {
        Ok(self.state.lock().await.completed.insert((user_id, contest_id)))
    }

    async fn completed_contests(&self, user_id: i32) -> StoreResult<Vec<i32>> {
        let state = self.state.lock().await;
        Ok(state
            .completed
            .range((user_id, i32::MIN)..=(user_id, i32::MAX))
            .map(|&(_, contest_id)| contest_id)
            .collect())
    }
}
