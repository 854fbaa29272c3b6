use common::SubmissionStatus;
use serde::{Deserialize, Serialize};

use crate::judge::JudgeVerdict;
use crate::services::{CaseReport, RunReport, SubmitReport};

/// Request body for submitting or running a solution.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SolutionRequest {
    /// Full source code.
    #[schema(example = "a, b = map(int, input().split())\nprint(a + b)")]
    pub code: String,
    /// Language name or alias (e.g. "cpp", "c++", "py").
    #[schema(example = "python")]
    pub language: String,
    /// Ties the submission to a running contest.
    #[schema(example = 3)]
    #[serde(default)]
    pub contest_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    pub success: bool,
    /// True only when every hidden test case passed.
    pub accepted: bool,
    #[schema(example = 128)]
    pub submission_id: i32,
    pub status: SubmissionStatus,
    #[schema(example = 2)]
    pub passed_test_cases: usize,
    #[schema(example = 3)]
    pub total_test_cases: usize,
    /// Milliseconds, summed over passed test cases.
    #[schema(example = 42)]
    pub runtime: i64,
    /// Kilobytes, peak over passed test cases.
    #[schema(example = 3120)]
    pub memory: i64,
    #[schema(example = 20.0)]
    pub score: f64,
    pub error_message: Option<String>,
}

impl From<SubmitReport> for SubmitResponse {
    fn from(report: SubmitReport) -> Self {
        let eval = report.evaluation;
        Self {
            success: true,
            accepted: eval.is_accepted(),
            submission_id: report.submission_id,
            status: eval.status,
            passed_test_cases: eval.passed,
            total_test_cases: eval.total,
            runtime: eval.runtime_ms,
            memory: eval.memory_kb,
            score: eval.score,
            error_message: eval.error_message,
        }
    }
}

/// Outcome of one sample test case.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CaseResult {
    pub test_case_id: i32,
    pub input: String,
    pub expected_output: String,
    pub stdout: Option<String>,
    pub verdict: JudgeVerdict,
    pub passed: bool,
    pub runtime: i64,
    pub memory: i64,
}

impl From<CaseReport> for CaseResult {
    fn from(case: CaseReport) -> Self {
        Self {
            test_case_id: case.test_case_id,
            input: case.input,
            expected_output: case.expected_output,
            stdout: case.stdout,
            verdict: case.verdict,
            passed: case.passed,
            runtime: case.runtime_ms,
            memory: case.memory_kb,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RunResponse {
    pub success: bool,
    /// Fetch this report again from `/runs/{run_id}` until it expires.
    pub run_id: String,
    pub status: SubmissionStatus,
    pub passed_test_cases: usize,
    pub total_test_cases: usize,
    pub runtime: i64,
    pub memory: i64,
    pub score: f64,
    pub error_message: Option<String>,
    pub results: Vec<CaseResult>,
}

impl RunResponse {
    pub fn new(run_id: String, report: RunReport) -> Self {
        let eval = report.evaluation;
        Self {
            success: true,
            run_id,
            status: eval.status,
            passed_test_cases: eval.passed,
            total_test_cases: eval.total,
            runtime: eval.runtime_ms,
            memory: eval.memory_kb,
            score: eval.score,
            error_message: eval.error_message,
            results: report.cases.into_iter().map(CaseResult::from).collect(),
        }
    }
}
