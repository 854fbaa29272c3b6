use arena_server::entity::{contest, problem};
use arena_server::store::{
    ContestHistoryEntry, ContestStore, LeaderboardStore, NewSubmission, RankingEntry,
    SubmissionOutcome, SubmissionStore, UserStore, UserStreak,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::SubmissionStatus;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::common::postgres::db_store;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
}

async fn insert_contest(db: &DatabaseConnection, end_time: DateTime<Utc>) -> i32 {
    contest::ActiveModel {
        title: Set("Weekly".into()),
        start_time: Set(end_time - Duration::hours(2)),
        end_time: Set(end_time),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

async fn insert_problem(db: &DatabaseConnection) -> i32 {
    problem::ActiveModel {
        title: Set("Two Sum".into()),
        difficulty: Set("easy".into()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

fn ranking(user_id: i32, rank: u32) -> RankingEntry {
    RankingEntry {
        user_id,
        rank,
        score: 10.0,
        problems_solved: 1,
        total_runtime_ms: 40,
        problems: vec![],
    }
}

fn outcome(status: SubmissionStatus, score: f64) -> SubmissionOutcome {
    SubmissionOutcome {
        status,
        test_cases_passed: 2,
        total_test_cases: 3,
        runtime_ms: 25,
        memory_kb: 2048,
        error_message: None,
        score,
    }
}

mod leaderboards {
    use super::*;

    #[tokio::test]
    async fn concurrent_finalizers_have_one_winner() {
        let Some((store, db)) = db_store().await else { return };
        let contest_id = insert_contest(&db, at(1)).await;

        let first = vec![ranking(1, 1)];
        let second = vec![ranking(2, 1)];
        let (a, b) = tokio::join!(
            store.insert_finalized(contest_id, &first),
            store.insert_finalized(contest_id, &second),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.is_some() ^ b.is_some(), "exactly one insert must win");

        let winner = a.or(b).unwrap();
        let stored = store.find_finalized(contest_id).await.unwrap().unwrap();
        assert!(stored.is_finalized);
        assert_eq!(stored.id, winner.id);
        assert_eq!(stored.rankings, winner.rankings);

        // Later attempts keep losing.
        assert!(store.insert_finalized(contest_id, &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ended_contests_drop_out_once_finalized() {
        let Some((store, db)) = db_store().await else { return };
        let ended = insert_contest(&db, at(1)).await;
        let finalized = insert_contest(&db, at(2)).await;
        let upcoming = insert_contest(&db, at(20)).await;
        store.insert_finalized(finalized, &[]).await.unwrap();

        let due: Vec<i32> = store
            .list_ended_unfinalized(at(10))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(due, vec![ended]);
        assert!(!due.contains(&upcoming));
    }
}

mod submissions {
    use super::*;

    #[tokio::test]
    async fn terminal_row_is_not_overwritten() {
        let Some((store, db)) = db_store().await else { return };
        let problem_id = insert_problem(&db).await;

        let sub = store
            .create_pending(NewSubmission {
                user_id: 3,
                problem_id,
                contest_id: None,
                code: "print(1)".into(),
                language: "python".into(),
                total_test_cases: 3,
            })
            .await
            .unwrap();
        assert_eq!(sub.status, SubmissionStatus::Pending);

        assert!(store.advance_status(sub.id, SubmissionStatus::Processing).await.unwrap());
        assert!(store.complete(sub.id, &outcome(SubmissionStatus::WrongAnswer, 6.0)).await.unwrap());

        assert!(!store.complete(sub.id, &outcome(SubmissionStatus::Accepted, 10.0)).await.unwrap());
        assert!(!store.advance_status(sub.id, SubmissionStatus::Processing).await.unwrap());

        let stored = store.find_submission(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::WrongAnswer);
        assert_eq!(stored.score, 6.0);
        assert_eq!(stored.test_cases_passed, 2);
    }
}

mod users {
    use super::*;

    #[tokio::test]
    async fn set_inserts_report_novelty() {
        let Some((store, _db)) = db_store().await else { return };

        assert!(store.add_solved_problem(1, 5).await.unwrap());
        assert!(!store.add_solved_problem(1, 5).await.unwrap());
        assert!(store.add_solved_problem(1, 2).await.unwrap());
        assert_eq!(store.solved_problems(1).await.unwrap(), vec![2, 5]);

        assert!(store.add_completed_contest(1, 9).await.unwrap());
        assert!(!store.add_completed_contest(1, 9).await.unwrap());
        assert_eq!(store.completed_contests(1).await.unwrap(), vec![9]);
        assert!(store.completed_contests(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_is_keyed_by_contest() {
        let Some((store, _db)) = db_store().await else { return };
        let entry = |contest_id, rank| ContestHistoryEntry {
            contest_id,
            rank,
            score: 15.0,
            problems_solved: 2,
            total_runtime_ms: 90,
            finalized_at: at(3),
        };

        store.upsert_contest_history(4, &entry(7, 3)).await.unwrap();
        store.upsert_contest_history(4, &entry(8, 5)).await.unwrap();
        store.upsert_contest_history(4, &entry(7, 1)).await.unwrap();

        let mut history = store.contest_history(4).await.unwrap();
        history.sort_by_key(|h| h.contest_id);
        assert_eq!(history, vec![entry(7, 1), entry(8, 5)]);
    }

    #[tokio::test]
    async fn streak_save_replaces_previous() {
        let Some((store, _db)) = db_store().await else { return };
        assert!(store.find_streak(6).await.unwrap().is_none());

        let first = UserStreak { streak: 1, last_completed_at: Some(at(1)) };
        let second = UserStreak { streak: 2, last_completed_at: Some(at(2)) };
        store.save_streak(6, &first).await.unwrap();
        store.save_streak(6, &second).await.unwrap();

        assert_eq!(store.find_streak(6).await.unwrap(), Some(second));
    }
}
