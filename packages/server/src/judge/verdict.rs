use common::SubmissionStatus;
use serde::Serialize;

/// Closed set of sandbox statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub enum JudgeVerdict {
    Queued,
    Processing,
    Accepted,
    WrongAnswer,
    CompileError,
    RuntimeError,
    Unknown,
}

impl JudgeVerdict {
    /// Map the sandbox's numeric status id.
    ///
    /// 1 queued, 2 processing, 3 accepted, 4 wrong answer, 6 compilation
    /// error; 5 (time limit) and 7-12 (signals, NZEC, other runtime) are
    /// runtime errors. Internal and unrecognized ids are `Unknown`.
    pub fn from_status_id(id: i64) -> Self {
        match id {
            1 => Self::Queued,
            2 => Self::Processing,
            3 => Self::Accepted,
            4 => Self::WrongAnswer,
            6 => Self::CompileError,
            5 | 7..=12 => Self::RuntimeError,
            _ => Self::Unknown,
        }
    }

    /// Returns true once the sandbox has finished with the execution.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Processing)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Submission status recorded when this verdict is the first failure.
    pub fn to_submission_status(self) -> SubmissionStatus {
        match self {
            Self::Queued => SubmissionStatus::Pending,
            Self::Processing => SubmissionStatus::Processing,
            Self::Accepted => SubmissionStatus::Accepted,
            Self::WrongAnswer => SubmissionStatus::WrongAnswer,
            Self::CompileError => SubmissionStatus::CompileError,
            Self::RuntimeError | Self::Unknown => SubmissionStatus::Error,
        }
    }
}
