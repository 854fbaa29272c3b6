use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::judge::JudgeClient;
use crate::notify::Notifier;
use crate::rate_limit::{SlidingWindowLimiter, WindowStore};
use crate::services::{Finalizer, LeaderboardService, RunReport, SubmissionService};
use crate::session::SessionStore;
use crate::store::Stores;

/// External collaborators the engine is wired to.
pub struct Backends {
    pub stores: Stores,
    pub judge: Arc<dyn JudgeClient>,
    pub notifier: Arc<dyn Notifier>,
    pub windows: Arc<dyn WindowStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub submissions: SubmissionService,
    pub leaderboards: LeaderboardService,
    pub finalizer: Finalizer,
    pub rate_limiter: SlidingWindowLimiter,
    pub runs: Arc<SessionStore<RunReport>>,
}

impl AppState {
    pub fn new(config: AppConfig, backends: Backends) -> Self {
        let runs = Arc::new(SessionStore::new(Duration::from_secs(
            config.session.run_ttl_secs,
        )));

        let submissions = SubmissionService::new(
            backends.stores.clone(),
            backends.judge,
            backends.notifier.clone(),
            runs.clone(),
            config.submission.max_code_bytes,
        );
        let leaderboards =
            LeaderboardService::new(backends.stores.clone(), backends.notifier.clone());
        let finalizer = Finalizer::new(backends.stores, backends.notifier);
        let rate_limiter = SlidingWindowLimiter::new(backends.windows, &config.rate_limit);

        Self {
            config: Arc::new(config),
            submissions,
            leaderboards,
            finalizer,
            rate_limiter,
            runs,
        }
    }
}
