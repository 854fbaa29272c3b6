use arena_server::store::{SubmissionStore, UserStore};
use common::{Room, SubmissionStatus};
use serde_json::json;

use crate::common::{As, TestApp, routes};

const ADD: &[(&str, &str)] = &[("1 2", "1 2"), ("40 2", "40 2")];

mod submit {
    use super::*;

    #[tokio::test]
    async fn accepted_solution_is_graded_and_stored() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[("0", "0")], ADD).await;

        let res = app.submit(problem, "echo", None, As::user(7)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["accepted"], true);
        assert_eq!(res.body["status"], "Accepted");
        assert_eq!(res.body["passed_test_cases"], 2);
        assert_eq!(res.body["total_test_cases"], 2);
        assert_eq!(res.body["score"].as_f64().unwrap(), 10.0);
        assert_eq!(res.body["runtime"], 24);
        assert_eq!(res.body["memory"], 2048);
        assert!(res.body["error_message"].is_null());

        let id = res.body["submission_id"].as_i64().unwrap() as i32;
        let stored = app.store.find_submission(id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Accepted);
        assert_eq!(stored.user_id, 7);
        assert_eq!(stored.language, "python");
        assert_eq!(stored.test_cases_passed, 2);
        assert_eq!(app.sandbox.executions(), 2);
    }

    #[tokio::test]
    async fn accepted_solution_marks_problem_solved_and_notifies() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(2, "medium", &[], ADD).await;
        let mut events = app.notifier.subscribe();

        let res = app.submit(problem, "echo", None, As::user(3)).await;
        assert_eq!(res.status, 200, "{}", res.text);

        assert_eq!(app.store.solved_problems(3).await.unwrap(), vec![2]);
        let event = events.recv().await.unwrap();
        assert_eq!(event.topic, "user-stats-changed");
        assert_eq!(event.room, Room::User(3));
        assert_eq!(event.payload["solved_count"], 1);
    }

    #[tokio::test]
    async fn solving_twice_counts_once() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(2, "medium", &[], ADD).await;

        app.submit(problem, "echo", None, As::user(3)).await;
        let mut events = app.notifier.subscribe();
        let res = app.submit(problem, "echo", None, As::user(3)).await;

        assert_eq!(res.body["accepted"], true);
        assert_eq!(app.store.solved_problems(3).await.unwrap(), vec![2]);
        let event = events.recv().await.unwrap();
        assert_eq!(event.payload["solved_count"], 1);
    }

    #[tokio::test]
    async fn wrong_answer_scores_passed_cases() {
        let app = TestApp::spawn().await;
        let problem = app
            .create_problem(3, "hard", &[], &[("a", "a"), ("b", "c"), ("d", "d")])
            .await;

        let res = app.submit(problem, "echo", None, As::user(1)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["accepted"], false);
        assert_eq!(res.body["status"], "WrongAnswer");
        assert_eq!(res.body["passed_test_cases"], 1);
        assert_eq!(res.body["total_test_cases"], 3);
        assert!((res.body["score"].as_f64().unwrap() - 10.0).abs() < 1e-9);
        assert!(app.store.solved_problems(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn compile_error_reports_compiler_output() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(4, "easy", &[], ADD).await;

        let res = app.submit(problem, "compile_error", None, As::user(1)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "CompileError");
        assert_eq!(res.body["passed_test_cases"], 0);
        assert_eq!(res.body["score"].as_f64().unwrap(), 0.0);
        assert!(
            res.body["error_message"]
                .as_str()
                .unwrap()
                .contains("expected ';'")
        );
    }

    #[tokio::test]
    async fn runtime_failure_is_an_error_verdict() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(5, "easy", &[], ADD).await;

        let res = app.submit(problem, "crash", None, As::user(1)).await;

        assert_eq!(res.body["status"], "Error");
        assert_eq!(
            res.body["error_message"].as_str().unwrap(),
            "Segmentation fault"
        );
    }

    #[tokio::test]
    async fn language_aliases_are_normalized() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(6, "easy", &[], ADD).await;

        let res = app
            .post_as(
                &routes::submit(problem),
                &json!({ "code": "echo", "language": "C++" }),
                As::user(1),
            )
            .await;

        let id = res.body["submission_id"].as_i64().unwrap() as i32;
        let stored = app.store.find_submission(id).await.unwrap().unwrap();
        assert_eq!(stored.language, "cpp");
    }
}

mod submit_validation {
    use super::*;

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[], ADD).await;

        let res = app
            .post_anonymous(
                &routes::submit(problem),
                &json!({ "code": "echo", "language": "python" }),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn empty_code_never_reaches_the_sandbox() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[], ADD).await;

        let res = app.submit(problem, "   ", None, As::user(1)).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.sandbox.executions(), 0);
    }

    #[tokio::test]
    async fn oversized_code_is_rejected() {
        let app = TestApp::spawn_with(|c| c.submission.max_code_bytes = 16).await;
        let problem = app.create_problem(1, "easy", &[], ADD).await;

        let res = app
            .submit(problem, &"x".repeat(17), None, As::user(1))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(app.sandbox.executions(), 0);
    }

    #[tokio::test]
    async fn unknown_language_is_rejected() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[], ADD).await;

        let res = app
            .post_as(
                &routes::submit(problem),
                &json!({ "code": "echo", "language": "cobol" }),
                As::user(1),
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["message"].as_str().unwrap().contains("cobol"));
    }

    #[tokio::test]
    async fn malformed_body_uses_error_envelope() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[], ADD).await;

        let res = app
            .post_as(&routes::submit(problem), &json!({ "code": "echo" }), As::user(1))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_problem_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.submit(999, "echo", None, As::user(1)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn problem_without_hidden_cases_is_rejected() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[("1", "1")], &[]).await;

        let res = app.submit(problem, "echo", None, As::user(1)).await;

        assert_eq!(res.status, 400);
        assert_eq!(app.sandbox.executions(), 0);
    }

    #[tokio::test]
    async fn contest_must_be_running() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[], ADD).await;
        let ended = app.create_ended_contest(10).await;

        let res = app.submit(problem, "echo", Some(ended), As::user(1)).await;
        assert_eq!(res.status, 400);

        let res = app.submit(problem, "echo", Some(404), As::user(1)).await;
        assert_eq!(res.status, 404);
    }
}

mod run {
    use super::*;

    #[tokio::test]
    async fn run_reports_every_sample_case() {
        let app = TestApp::spawn().await;
        let problem = app
            .create_problem(1, "easy", &[("x", "x"), ("y", "z")], ADD)
            .await;

        let res = app
            .post_as(
                &routes::run(problem),
                &json!({ "code": "echo", "language": "py" }),
                As::user(1),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "WrongAnswer");
        assert_eq!(res.body["total_test_cases"], 2);

        let results = res.body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["passed"], true);
        assert_eq!(results[0]["stdout"], "x");
        assert_eq!(results[1]["passed"], false);
        assert_eq!(results[1]["expected_output"], "z");
        // only samples were executed
        assert_eq!(app.sandbox.executions(), 2);
    }

    #[tokio::test]
    async fn run_report_can_be_fetched_again() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[("x", "x")], ADD).await;

        let res = app
            .post_as(
                &routes::run(problem),
                &json!({ "code": "echo", "language": "python" }),
                As::user(1),
            )
            .await;
        let run_id = res.body["run_id"].as_str().unwrap().to_string();

        let fetched = app.get_as(&routes::run_report(&run_id), As::user(1)).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["run_id"], run_id);
        assert_eq!(fetched.body["status"], "Accepted");
        assert_eq!(fetched.body["results"], res.body["results"]);
    }

    #[tokio::test]
    async fn run_report_is_hidden_from_other_users() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[("x", "x")], ADD).await;

        let res = app
            .post_as(
                &routes::run(problem),
                &json!({ "code": "echo", "language": "python" }),
                As::user(1),
            )
            .await;
        let run_id = res.body["run_id"].as_str().unwrap().to_string();

        let other = app.get_as(&routes::run_report(&run_id), As::user(2)).await;
        assert_eq!(other.status, 404);
        assert_eq!(other.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_run_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_as(&routes::run_report("nope"), As::user(1)).await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn run_is_not_persisted() {
        let app = TestApp::spawn().await;
        let problem = app.create_problem(1, "easy", &[("x", "x")], ADD).await;

        app.post_as(
            &routes::run(problem),
            &json!({ "code": "echo", "language": "python" }),
            As::user(1),
        )
        .await;

        assert!(app.store.find_submission(1).await.unwrap().is_none());
        assert!(app.store.solved_problems(1).await.unwrap().is_empty());
    }
}
