use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/problems", problem_routes())
        .nest("/runs", run_routes())
        .nest("/contests", contest_routes())
}

fn problem_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::submission::submit_solution))
        .routes(routes!(handlers::submission::run_solution))
}

fn run_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::submission::get_run))
}

fn contest_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::leaderboard::get_leaderboard))
        .routes(routes!(handlers::leaderboard::finalize_contest))
}
