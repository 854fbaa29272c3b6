pub mod contest;
pub mod leaderboard;
pub mod problem;
pub mod submission;
pub mod test_case;
pub mod user_completed_contest;
pub mod user_contest_history;
pub mod user_solved_problem;
pub mod user_stats;
