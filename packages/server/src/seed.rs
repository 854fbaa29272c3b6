use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::submission;

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Leaderboard aggregation:
    // SELECT * FROM submission WHERE contest_id = ? ORDER BY created_at, id
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_submission_contest_created")
        .table(submission::Entity)
        .col(submission::Column::ContestId)
        .col(submission::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index idx_submission_contest_created exists"),
        Err(e) => warn!("Failed to create index idx_submission_contest_created: {}", e),
    }

    // Per-user history lookups
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_submission_user_problem")
        .table(submission::Entity)
        .col(submission::Column::UserId)
        .col(submission::Column::ProblemId)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index idx_submission_user_problem exists"),
        Err(e) => warn!("Failed to create index idx_submission_user_problem: {}", e),
    }

    Ok(())
}
