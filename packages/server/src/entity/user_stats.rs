use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,

    /// Consecutive UTC days with a completed contest.
    pub streak: i32,
    pub last_completed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
