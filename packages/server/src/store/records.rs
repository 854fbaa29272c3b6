use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: i32,
    pub input: String,
    pub expected_output: String,
}

#[derive(Debug, Clone)]
pub struct ProblemRecord {
    pub id: i32,
    pub title: String,
    pub difficulty: String,
    /// Sample cases, used by run mode.
    pub visible_cases: Vec<TestCase>,
    /// Graded cases, used by submit mode.
    pub hidden_cases: Vec<TestCase>,
}

#[derive(Debug, Clone)]
pub struct ContestRecord {
    pub id: i32,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ContestRecord {
    /// Inclusive on both ends.
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    pub fn has_ended_at(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub id: i32,
    pub user_id: i32,
    pub problem_id: i32,
    pub contest_id: Option<i32>,
    pub code: String,
    pub language: String,
    pub status: SubmissionStatus,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub runtime_ms: i64,
    pub memory_kb: i64,
    pub error_message: Option<String>,
    pub score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: i32,
    pub problem_id: i32,
    pub contest_id: Option<i32>,
    pub code: String,
    pub language: String,
    pub total_test_cases: i32,
}

/// Terminal fields written once judging finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub status: SubmissionStatus,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub runtime_ms: i64,
    pub memory_kb: i64,
    pub error_message: Option<String>,
    pub score: f64,
}

/// Best submission a user made for one problem in a contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProblemSummary {
    pub problem_id: i32,
    pub submission_id: i32,
    pub status: SubmissionStatus,
    pub score: f64,
    pub runtime_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankingEntry {
    pub user_id: i32,
    /// 1-based, no ties.
    pub rank: u32,
    pub score: f64,
    pub problems_solved: u32,
    pub total_runtime_ms: i64,
    pub problems: Vec<ProblemSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRecord {
    pub id: i32,
    pub contest_id: i32,
    pub rankings: Vec<RankingEntry>,
    pub is_finalized: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserStreak {
    pub streak: u32,
    pub last_completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContestHistoryEntry {
    pub contest_id: i32,
    pub rank: u32,
    pub score: f64,
    pub problems_solved: u32,
    pub total_runtime_ms: i64,
    pub finalized_at: DateTime<Utc>,
}
