pub mod postgres;

use std::net::SocketAddr;
use std::sync::Arc;

use arena_server::config::{
    AppConfig, CorsConfig, DatabaseConfig, FinalizerConfig, JudgeConfig, RateLimitConfig,
    RedisConfig, ServerConfig, SessionConfig, SubmissionConfig,
};
use arena_server::judge::HttpJudgeClient;
use arena_server::notify::BroadcastNotifier;
use arena_server::rate_limit::MemoryWindowStore;
use arena_server::state::{AppState, Backends};
use arena_server::store::{ContestRecord, MemoryStore, ProblemRecord, Stores, TestCase};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::Value;

use self::sandbox::FakeSandbox;

pub mod routes {
    pub fn submit(problem_id: i32) -> String {
        format!("/api/v1/problems/{problem_id}/submit")
    }

    pub fn run(problem_id: i32) -> String {
        format!("/api/v1/problems/{problem_id}/run")
    }

    pub fn run_report(run_id: &str) -> String {
        format!("/api/v1/runs/{run_id}")
    }

    pub fn leaderboard(contest_id: i32) -> String {
        format!("/api/v1/contests/{contest_id}/leaderboard")
    }

    pub fn finalize(contest_id: i32) -> String {
        format!("/api/v1/contests/{contest_id}/finalize")
    }
}

/// Identity sent through the trusted caller headers.
#[derive(Debug, Clone, Copy)]
pub struct As {
    pub user_id: i32,
    pub admin: bool,
}

impl As {
    pub fn user(user_id: i32) -> Self {
        Self {
            user_id,
            admin: false,
        }
    }

    pub fn admin(user_id: i32) -> Self {
        Self {
            user_id,
            admin: true,
        }
    }
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let retry_after = res
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            retry_after,
            text,
            body,
        }
    }
}

/// A running test server backed by in-memory stores and a fake sandbox.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<BroadcastNotifier>,
    pub sandbox: FakeSandbox,
}

pub fn test_config(judge_url: String) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
        },
        redis: RedisConfig {
            enabled: false,
            ..Default::default()
        },
        judge: JudgeConfig {
            base_url: judge_url,
            poll_interval_ms: 10,
            backoff_base_ms: 10,
            jitter: false,
            poll_deadline_secs: 10,
            ..Default::default()
        },
        rate_limit: RateLimitConfig::default(),
        submission: SubmissionConfig::default(),
        finalizer: FinalizerConfig {
            enabled: false,
            ..Default::default()
        },
        session: SessionConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let sandbox = FakeSandbox::spawn().await;
        let mut config = test_config(sandbox.base_url());
        customize(&mut config);

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(BroadcastNotifier::default());
        let judge =
            Arc::new(HttpJudgeClient::new(&config.judge).expect("Failed to build judge client"));

        let state = AppState::new(
            config,
            Backends {
                stores: Stores::shared(store.clone()),
                judge,
                notifier: notifier.clone(),
                windows: Arc::new(MemoryWindowStore::new()),
            },
        );
        let app = arena_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            store,
            notifier,
            sandbox,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder, who: As) -> reqwest::RequestBuilder {
        let req = req.header("X-User-Id", who.user_id.to_string());
        if who.admin {
            req.header("X-User-Role", "admin")
        } else {
            req
        }
    }

    pub async fn post_as(&self, path: &str, body: &Value, who: As) -> TestResponse {
        let res = self
            .authorize(self.client.post(self.url(path)), who)
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_anonymous(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_as(&self, path: &str, who: As) -> TestResponse {
        let res = self
            .authorize(self.client.get(self.url(path)), who)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Problem whose sample and hidden cases are `(input, expected)` pairs.
    pub async fn create_problem(
        &self,
        id: i32,
        difficulty: &str,
        visible: &[(&str, &str)],
        hidden: &[(&str, &str)],
    ) -> i32 {
        let cases = |offset: i32, pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .enumerate()
                .map(|(i, (input, expected))| TestCase {
                    id: id * 100 + offset + i as i32,
                    input: input.to_string(),
                    expected_output: expected.to_string(),
                })
                .collect::<Vec<_>>()
        };

        self.store
            .insert_problem(ProblemRecord {
                id,
                title: format!("Problem {id}"),
                difficulty: difficulty.to_string(),
                visible_cases: cases(0, visible),
                hidden_cases: cases(50, hidden),
            })
            .await;
        id
    }

    /// Contest that started an hour ago and ends in an hour.
    pub async fn create_running_contest(&self, id: i32) -> i32 {
        let now = Utc::now();
        self.store
            .insert_contest(ContestRecord {
                id,
                title: format!("Contest {id}"),
                start_time: now - Duration::hours(1),
                end_time: now + Duration::hours(1),
            })
            .await;
        id
    }

    /// Contest that ended a minute ago.
    pub async fn create_ended_contest(&self, id: i32) -> i32 {
        let now = Utc::now();
        self.store
            .insert_contest(ContestRecord {
                id,
                title: format!("Contest {id}"),
                start_time: now - Duration::hours(2),
                end_time: now - Duration::minutes(1),
            })
            .await;
        id
    }

    pub async fn submit(
        &self,
        problem_id: i32,
        code: &str,
        contest_id: Option<i32>,
        who: As,
    ) -> TestResponse {
        let body = serde_json::json!({
            "code": code,
            "language": "python",
            "contest_id": contest_id,
        });
        self.post_as(&routes::submit(problem_id), &body, who).await
    }

    /// End a running contest in place so it can be finalized.
    pub async fn end_contest(&self, id: i32) {
        let now = Utc::now();
        self.store
            .insert_contest(ContestRecord {
                id,
                title: format!("Contest {id}"),
                start_time: now - Duration::hours(2),
                end_time: now - Duration::seconds(1),
            })
            .await;
    }
}
