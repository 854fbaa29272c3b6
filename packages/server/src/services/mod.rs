pub mod finalizer;
pub mod leaderboard;
pub mod submission;

pub use finalizer::{FinalizeOutcome, Finalizer, run_finalizer_sweep};
pub use leaderboard::{LeaderboardService, LeaderboardView, aggregate};
pub use submission::{
    CaseReport, Evaluation, RunReport, SubmissionRequest, SubmissionService, SubmitReport,
};
