use common::SubmissionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub code: String,
    pub language: String,
    pub status: SubmissionStatus,

    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub runtime_ms: i64, // sum over passed test cases
    pub memory_kb: i64,  // largest test case
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub score: f64,

    pub user_id: i32,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    /// NULL for practice submissions.
    pub contest_id: Option<i32>,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: BelongsTo<Option<super::contest::Entity>>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
