#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a submission during the judging lifecycle.
///
/// Statuses only move forward: `Pending -> Processing -> terminal`. Once a
/// terminal status is recorded it is never replaced.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    /// Recorded, not yet handed to the sandbox.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Pending"))]
    Pending,
    /// Dispatched to the sandbox, waiting for every test case to finish.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Processing"))]
    Processing,
    /// Every evaluated test case passed.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Accepted"))]
    Accepted,
    /// A test case produced the wrong output.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WrongAnswer"))]
    WrongAnswer,
    /// The sandbox failed to compile the source.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CompileError"))]
    CompileError,
    /// Runtime error, time limit, or any other sandbox failure.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Error"))]
    Error,
}

impl SubmissionStatus {
    /// Returns true if this is a final verdict (judging is complete).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Processing)
    }

    /// Returns true if this is a successful verdict.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    fn stage(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            _ => 2,
        }
    }

    /// Whether a record currently in `self` may be moved to `next`.
    pub fn can_advance_to(&self, next: SubmissionStatus) -> bool {
        !self.is_terminal() && next.stage() > self.stage()
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Processing,
        Self::Accepted,
        Self::WrongAnswer,
        Self::CompileError,
        Self::Error,
    ];

    /// Statuses that may still be overwritten.
    pub const NON_TERMINAL: &'static [SubmissionStatus] = &[Self::Pending, Self::Processing];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "WrongAnswer",
            Self::CompileError => "CompileError",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
            })
    }
}
