use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user's final standing in one contest.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_contest_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub user_id: i32,
    #[sea_orm(primary_key)]
    pub contest_id: i32,

    pub rank: i32,
    pub score: f64,
    pub problems_solved: i32,
    pub total_runtime_ms: i64,
    pub finalized_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
