use std::sync::Arc;

use chrono::Utc;
use common::SubmissionStatus;
use tracing::{error, info, instrument, warn};

use crate::error::AppError;
use crate::judge::{
    JudgeClient, JudgeError, JudgeOutcome, JudgeRequest, JudgeVerdict, Language, resolve_language,
};
use crate::notify::{Notifier, UserStatsChanged, publish_best_effort};
use crate::scoring;
use crate::session::SessionStore;
use crate::store::{NewSubmission, ProblemRecord, Stores, SubmissionOutcome, TestCase};

/// What a caller wants judged.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub user_id: i32,
    pub problem_id: i32,
    pub contest_id: Option<i32>,
    pub code: String,
    pub language: String,
}

/// Summary of one judged batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: SubmissionStatus,
    pub passed: usize,
    pub total: usize,
    /// Sum over the accepted prefix.
    pub runtime_ms: i64,
    /// Max over the accepted prefix.
    pub memory_kb: i64,
    pub error_message: Option<String>,
    pub score: f64,
}

impl Evaluation {
    pub fn is_accepted(&self) -> bool {
        self.status.is_accepted()
    }

    fn to_outcome(&self) -> SubmissionOutcome {
        SubmissionOutcome {
            status: self.status,
            test_cases_passed: self.passed as i32,
            total_test_cases: self.total as i32,
            runtime_ms: self.runtime_ms,
            memory_kb: self.memory_kb,
            error_message: self.error_message.clone(),
            score: self.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    pub test_case_id: i32,
    pub input: String,
    pub expected_output: String,
    pub stdout: Option<String>,
    pub verdict: JudgeVerdict,
    pub passed: bool,
    pub runtime_ms: i64,
    pub memory_kb: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    pub submission_id: i32,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Only this user may read the report back.
    pub user_id: i32,
    pub evaluation: Evaluation,
    pub cases: Vec<CaseReport>,
}

/// Fold sandbox results into a verdict.
///
/// Results are walked in test-case order. The walk stops at the first
/// result that is not accepted; later results do not count.
pub fn evaluate(difficulty: &str, outcomes: &[JudgeOutcome], total: usize) -> Evaluation {
    let mut passed = 0;
    let mut runtime_ms = 0;
    let mut memory_kb = 0;
    let mut failure = None;

    for outcome in outcomes.iter().take(total) {
        if !outcome.verdict.is_accepted() {
            failure = Some((
                outcome.verdict.to_submission_status(),
                outcome.error_payload(),
            ));
            break;
        }
        passed += 1;
        runtime_ms += outcome.runtime_ms;
        memory_kb = memory_kb.max(outcome.memory_kb);
    }

    let (status, error_message) = match failure {
        Some(failure) => failure,
        None if passed == total => (SubmissionStatus::Accepted, None),
        None => (
            SubmissionStatus::Error,
            Some(format!("Judge returned {} of {} results", passed, total)),
        ),
    };

    Evaluation {
        status,
        passed,
        total,
        runtime_ms,
        memory_kb,
        error_message,
        score: scoring::score(difficulty, total, passed),
    }
}

fn case_reports(cases: &[TestCase], outcomes: &[JudgeOutcome]) -> Vec<CaseReport> {
    cases
        .iter()
        .zip(outcomes)
        .map(|(case, outcome)| CaseReport {
            test_case_id: case.id,
            input: case.input.clone(),
            expected_output: case.expected_output.clone(),
            stdout: outcome.stdout.clone(),
            verdict: outcome.verdict,
            passed: outcome.verdict.is_accepted(),
            runtime_ms: outcome.runtime_ms,
            memory_kb: outcome.memory_kb,
        })
        .collect()
}

fn judge_requests(language: &Language, code: &str, cases: &[TestCase]) -> Vec<JudgeRequest> {
    cases
        .iter()
        .map(|case| JudgeRequest {
            source_code: code.to_string(),
            language_id: language.judge_id,
            stdin: case.input.clone(),
            expected_output: case.expected_output.clone(),
        })
        .collect()
}

/// Drives a submission or a run from request to verdict.
#[derive(Clone)]
pub struct SubmissionService {
    stores: Stores,
    judge: Arc<dyn JudgeClient>,
    notifier: Arc<dyn Notifier>,
    runs: Arc<SessionStore<RunReport>>,
    max_code_bytes: usize,
}

impl SubmissionService {
    pub fn new(
        stores: Stores,
        judge: Arc<dyn JudgeClient>,
        notifier: Arc<dyn Notifier>,
        runs: Arc<SessionStore<RunReport>>,
        max_code_bytes: usize,
    ) -> Self {
        Self {
            stores,
            judge,
            notifier,
            runs,
            max_code_bytes,
        }
    }

    /// Judge against the hidden cases and persist the result.
    #[instrument(
        skip(self, req),
        fields(user_id = req.user_id, problem_id = req.problem_id, contest_id = ?req.contest_id)
    )]
    pub async fn submit(&self, req: SubmissionRequest) -> Result<SubmitReport, AppError> {
        let (language, problem) = self.prepare(&req).await?;
        let cases = &problem.hidden_cases;
        if cases.is_empty() {
            return Err(AppError::Validation(
                "Problem has no hidden test cases".into(),
            ));
        }

        let record = self
            .stores
            .submissions
            .create_pending(NewSubmission {
                user_id: req.user_id,
                problem_id: problem.id,
                contest_id: req.contest_id,
                code: req.code.clone(),
                language: language.name.to_string(),
                total_test_cases: cases.len() as i32,
            })
            .await?;
        let submission_id = record.id;

        let requests = judge_requests(&language, &req.code, cases);
        let tokens = self
            .judge
            .submit_batch(&requests)
            .await
            .map_err(|e| unfinished(submission_id, SubmissionStatus::Pending, e))?;

        self.stores
            .submissions
            .advance_status(submission_id, SubmissionStatus::Processing)
            .await?;

        let outcomes = self
            .judge
            .poll_results(&tokens)
            .await
            .map_err(|e| unfinished(submission_id, SubmissionStatus::Processing, e))?;

        let evaluation = evaluate(&problem.difficulty, &outcomes, cases.len());
        let written = self
            .stores
            .submissions
            .complete(submission_id, &evaluation.to_outcome())
            .await?;
        if !written {
            warn!(submission_id, "Submission already terminal, result not recorded");
        }

        info!(
            submission_id,
            status = %evaluation.status,
            passed = evaluation.passed,
            total = evaluation.total,
            score = evaluation.score,
            "Submission judged"
        );

        if evaluation.is_accepted() {
            self.record_solve(req.user_id, problem.id, submission_id)
                .await?;
        }

        Ok(SubmitReport {
            submission_id,
            evaluation,
        })
    }

    /// Judge against the sample cases. Nothing is persisted; the report is
    /// cached and can be fetched again by the returned run id.
    #[instrument(skip(self, req), fields(user_id = req.user_id, problem_id = req.problem_id))]
    pub async fn run(&self, req: SubmissionRequest) -> Result<(String, RunReport), AppError> {
        let (language, problem) = self.prepare(&req).await?;
        let cases = &problem.visible_cases;
        if cases.is_empty() {
            return Err(AppError::Validation(
                "Problem has no sample test cases".into(),
            ));
        }

        let requests = judge_requests(&language, &req.code, cases);
        let tokens = self.judge.submit_batch(&requests).await?;
        let outcomes = self.judge.poll_results(&tokens).await?;

        let report = RunReport {
            user_id: req.user_id,
            evaluation: evaluate(&problem.difficulty, &outcomes, cases.len()),
            cases: case_reports(cases, &outcomes),
        };
        let run_id = self.runs.insert(report.clone());
        Ok((run_id, report))
    }

    /// A cached run report, visible only to the user who ran it.
    pub fn get_run(&self, run_id: &str, user_id: i32) -> Option<RunReport> {
        self.runs
            .get(run_id)
            .filter(|report| report.user_id == user_id)
    }

    /// Validation shared by submit and run. Fails before anything is written
    /// or sent to the sandbox.
    async fn prepare(
        &self,
        req: &SubmissionRequest,
    ) -> Result<(Language, ProblemRecord), AppError> {
        if req.code.trim().is_empty() {
            return Err(AppError::Validation("Code must not be empty".into()));
        }
        if req.code.len() > self.max_code_bytes {
            return Err(AppError::Validation(format!(
                "Code exceeds {} bytes",
                self.max_code_bytes
            )));
        }
        let language = resolve_language(&req.language)?;

        let problem = self
            .stores
            .problems
            .find_problem(req.problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;

        if let Some(contest_id) = req.contest_id {
            let contest = self
                .stores
                .contests
                .find_contest(contest_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;
            if !contest.is_running_at(Utc::now()) {
                return Err(AppError::Validation("Contest is not running".into()));
            }
        }

        Ok((language, problem))
    }

    async fn record_solve(
        &self,
        user_id: i32,
        problem_id: i32,
        submission_id: i32,
    ) -> Result<(), AppError> {
        let users = &self.stores.users;
        if users.add_solved_problem(user_id, problem_id).await? {
            info!(user_id, problem_id, "Problem solved for the first time");
        }
        let solved_count = users.solved_problems(user_id).await?.len();

        let event = UserStatsChanged {
            user_id,
            problem_id,
            submission_id,
            solved_count,
        };
        publish_best_effort(self.notifier.as_ref(), &event).await;
        Ok(())
    }
}

/// The row stays where it is for out-of-band reconciliation.
fn unfinished(submission_id: i32, left_at: SubmissionStatus, e: JudgeError) -> AppError {
    error!(
        submission_id,
        status = %left_at,
        error = %e,
        "Judging failed, submission left unfinished"
    );
    e.into()
}
