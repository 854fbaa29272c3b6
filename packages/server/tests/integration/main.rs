mod common;
mod db_store;
mod leaderboard;
mod submission;
