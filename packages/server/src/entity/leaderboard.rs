use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Frozen rankings of a finished contest. At most one row per contest.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leaderboard")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub contest_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    /// Array of ranking entries, best first.
    #[sea_orm(column_type = "JsonBinary")]
    pub rankings: serde_json::Value,
    pub is_finalized: bool,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
