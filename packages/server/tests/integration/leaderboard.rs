use arena_server::store::UserStore;
use common::Room;

use crate::common::{As, TestApp, routes};

const CASES: &[(&str, &str)] = &[("1", "1"), ("2", "2")];

/// Contest 1 with an easy and a hard problem.
async fn contest_app() -> TestApp {
    let app = TestApp::spawn().await;
    app.create_problem(1, "easy", &[], CASES).await;
    app.create_problem(2, "hard", &[], CASES).await;
    app.create_running_contest(1).await;
    app
}

mod standings {
    use super::*;

    #[tokio::test]
    async fn live_standings_rank_by_score() {
        let app = contest_app().await;
        app.submit(1, "echo", Some(1), As::user(10)).await;
        app.submit(2, "echo", Some(1), As::user(20)).await;
        app.submit(1, "wrong", Some(1), As::user(30)).await;

        let res = app.get_anonymous(&routes::leaderboard(1)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_finalized"], false);
        let rankings = res.body["rankings"].as_array().unwrap();
        let order: Vec<i64> = rankings
            .iter()
            .map(|r| r["user_id"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![20, 10, 30]);
        assert_eq!(rankings[0]["rank"], 1);
        assert_eq!(rankings[0]["score"].as_f64().unwrap(), 30.0);
        assert_eq!(rankings[0]["problems_solved"], 1);
        assert_eq!(rankings[2]["score"].as_f64().unwrap(), 0.0);
        assert_eq!(rankings[2]["problems_solved"], 0);
    }

    #[tokio::test]
    async fn practice_submissions_do_not_count() {
        let app = contest_app().await;
        app.submit(1, "echo", None, As::user(10)).await;

        let res = app.get_anonymous(&routes::leaderboard(1)).await;

        assert!(res.body["rankings"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_contest_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_anonymous(&routes::leaderboard(77)).await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn broadcast_pushes_live_standings() {
        let app = contest_app().await;
        app.submit(1, "echo", Some(1), As::user(10)).await;
        let mut events = app.notifier.subscribe();

        let path = format!("{}?broadcast=true", routes::leaderboard(1));
        let res = app.get_anonymous(&path).await;
        assert_eq!(res.status, 200);

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .expect("no broadcast")
            .unwrap();
        assert_eq!(event.topic, "leaderboard-updated");
        assert_eq!(event.room, Room::Contest(1));
        assert_eq!(event.payload["rankings"], res.body["rankings"]);
    }
}

mod finalize {
    use super::*;

    #[tokio::test]
    async fn requires_admin() {
        let app = contest_app().await;
        app.end_contest(1).await;

        let res = app.post_as(&routes::finalize(1), &serde_json::json!({}), As::user(1)).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let res = app.post_anonymous(&routes::finalize(1), &serde_json::json!({})).await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn running_contest_cannot_be_finalized() {
        let app = contest_app().await;

        let res = app
            .post_as(&routes::finalize(1), &serde_json::json!({}), As::admin(1))
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn finalize_freezes_standings_and_updates_history() {
        let app = contest_app().await;
        app.submit(1, "echo", Some(1), As::user(10)).await;
        app.submit(2, "echo", Some(1), As::user(10)).await;
        app.submit(1, "echo", Some(1), As::user(20)).await;
        app.end_contest(1).await;

        let res = app
            .post_as(&routes::finalize(1), &serde_json::json!({}), As::admin(99))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_finalized"], true);
        assert_eq!(res.body["rankings"][0]["user_id"], 10);
        assert_eq!(res.body["rankings"][0]["score"].as_f64().unwrap(), 40.0);
        assert_eq!(res.body["rankings"][1]["user_id"], 20);

        let history = app.store.contest_history(20).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].rank, 2);
        assert_eq!(app.store.completed_contests(10).await.unwrap(), vec![1]);
        assert_eq!(app.store.find_streak(10).await.unwrap().unwrap().streak, 1);

        let board = app.get_anonymous(&routes::leaderboard(1)).await;
        assert_eq!(board.body["is_finalized"], true);
        assert_eq!(board.body["rankings"], res.body["rankings"]);
    }

    #[tokio::test]
    async fn second_finalize_is_rejected() {
        let app = contest_app().await;
        app.end_contest(1).await;

        let first = app
            .post_as(&routes::finalize(1), &serde_json::json!({}), As::admin(1))
            .await;
        let second = app
            .post_as(&routes::finalize(1), &serde_json::json!({}), As::admin(1))
            .await;

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 400);
    }

    #[tokio::test]
    async fn finalize_notifies_participants() {
        let app = contest_app().await;
        app.submit(1, "echo", Some(1), As::user(10)).await;
        app.end_contest(1).await;
        let mut events = app.notifier.subscribe();

        app.post_as(&routes::finalize(1), &serde_json::json!({}), As::admin(1))
            .await;

        let user_event = events.recv().await.unwrap();
        assert_eq!(user_event.topic, "leaderboard-finalized");
        assert_eq!(user_event.room, Room::User(10));
        assert_eq!(user_event.payload["standing"]["rank"], 1);

        let contest_event = events.recv().await.unwrap();
        assert_eq!(contest_event.room, Room::Contest(1));
        assert!(contest_event.payload["standing"].is_null());
    }
}
