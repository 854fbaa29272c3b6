use std::time::Duration;

use async_trait::async_trait;
use common::{RetryDecision, RetryPolicy};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{JudgeClient, JudgeError, JudgeOutcome, JudgeRequest, JudgeToken, JudgeVerdict};
use crate::config::JudgeConfig;

const STATUS_FIELDS: &str = "token,status,time,memory,stdout,stderr,compile_output";

#[derive(serde::Serialize)]
struct BatchSubmitBody<'a> {
    submissions: &'a [JudgeRequest],
}

#[derive(Deserialize)]
struct TokenItem {
    token: Option<String>,
}

#[derive(Deserialize)]
struct BatchStatusBody {
    submissions: Vec<StatusItem>,
}

#[derive(Deserialize)]
struct StatusItem {
    status: StatusRef,
    time: Option<Seconds>,
    memory: Option<i64>,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
}

#[derive(Deserialize)]
struct StatusRef {
    id: i64,
    description: Option<String>,
}

/// Execution time as the sandbox reports it: seconds, as text or a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Text(String),
    Number(f64),
}

impl Seconds {
    fn as_millis(&self) -> i64 {
        let secs = match self {
            Seconds::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Seconds::Number(n) => *n,
        };
        (secs * 1000.0).round() as i64
    }
}

impl From<StatusItem> for JudgeOutcome {
    fn from(item: StatusItem) -> Self {
        JudgeOutcome {
            verdict: JudgeVerdict::from_status_id(item.status.id),
            description: item.status.description,
            runtime_ms: item.time.as_ref().map(Seconds::as_millis).unwrap_or(0),
            memory_kb: item.memory.unwrap_or(0),
            stdout: item.stdout,
            stderr: item.stderr,
            compile_output: item.compile_output,
        }
    }
}

enum BatchStatus {
    Ready(Vec<JudgeOutcome>),
    RateLimited,
}

/// [`JudgeClient`] speaking the sandbox's HTTP batch API.
#[derive(Clone)]
pub struct HttpJudgeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    policy: RetryPolicy,
}

impl HttpJudgeClient {
    pub fn new(config: &JudgeConfig) -> Result<Self, JudgeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| JudgeError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            poll_interval: config.poll_interval(),
            policy: config.retry_policy(),
        })
    }

    fn batch_url(&self) -> String {
        format!("{}/submissions/batch", self.base_url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("X-Auth-Token", key),
            None => req,
        }
    }

    /// Fetch the current status of every token in one call.
    async fn fetch_batch(&self, tokens: &[JudgeToken]) -> Result<BatchStatus, JudgeError> {
        let joined = tokens
            .iter()
            .map(JudgeToken::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let res = self
            .authorize(self.http.get(self.batch_url()))
            .query(&[
                ("tokens", joined.as_str()),
                ("base64_encoded", "false"),
                ("fields", STATUS_FIELDS),
            ])
            .send()
            .await
            .map_err(|e| JudgeError::Unavailable(e.to_string()))?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            return Ok(BatchStatus::RateLimited);
        }
        if !res.status().is_success() {
            return Err(JudgeError::Unavailable(format!(
                "batch status returned {}",
                res.status()
            )));
        }

        let body: BatchStatusBody = res
            .json()
            .await
            .map_err(|e| JudgeError::Malformed(e.to_string()))?;

        if body.submissions.len() != tokens.len() {
            return Err(JudgeError::Malformed(format!(
                "asked for {} results, got {}",
                tokens.len(),
                body.submissions.len()
            )));
        }

        Ok(BatchStatus::Ready(
            body.submissions.into_iter().map(JudgeOutcome::from).collect(),
        ))
    }

    async fn poll_until_terminal(
        &self,
        tokens: &[JudgeToken],
    ) -> Result<Vec<JudgeOutcome>, JudgeError> {
        let mut rate_limited: u8 = 0;
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            match self.fetch_batch(tokens).await? {
                BatchStatus::RateLimited => {
                    rate_limited = rate_limited.saturating_add(1);
                    match self.policy.on_failure(rate_limited) {
                        RetryDecision::Retry { attempt, delay } => {
                            warn!(
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "Judge rate limited batch poll, backing off"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::Exhausted { attempts } => {
                            return Err(JudgeError::RateLimitExhausted { attempts });
                        }
                    }
                }
                BatchStatus::Ready(outcomes) => {
                    // budget and backoff restart with each throttle episode
                    rate_limited = 0;
                    let pending = outcomes.iter().filter(|o| !o.verdict.is_terminal()).count();
                    if pending == 0 {
                        debug!(polls, "All judge results terminal");
                        return Ok(outcomes);
                    }
                    debug!(polls, pending, "Judge results still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl JudgeClient for HttpJudgeClient {
    #[instrument(skip_all, fields(batch = requests.len()))]
    async fn submit_batch(&self, requests: &[JudgeRequest]) -> Result<Vec<JudgeToken>, JudgeError> {
        if requests.is_empty() {
            return Ok(vec![]);
        }

        let res = self
            .authorize(self.http.post(self.batch_url()))
            .query(&[("base64_encoded", "false")])
            .json(&BatchSubmitBody {
                submissions: requests,
            })
            .send()
            .await
            .map_err(|e| JudgeError::Unavailable(e.to_string()))?;

        if !res.status().is_success() {
            return Err(JudgeError::Unavailable(format!(
                "batch submit returned {}",
                res.status()
            )));
        }

        let items: Vec<TokenItem> = res
            .json()
            .await
            .map_err(|e| JudgeError::Malformed(e.to_string()))?;

        if items.len() != requests.len() {
            return Err(JudgeError::Malformed(format!(
                "submitted {} programs, got {} tokens",
                requests.len(),
                items.len()
            )));
        }

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                item.token
                    .map(JudgeToken)
                    .ok_or_else(|| JudgeError::Malformed(format!("no token for program {i}")))
            })
            .collect()
    }

    #[instrument(skip_all, fields(batch = tokens.len()))]
    async fn poll_results(&self, tokens: &[JudgeToken]) -> Result<Vec<JudgeOutcome>, JudgeError> {
        if tokens.is_empty() {
            return Ok(vec![]);
        }

        match self.policy.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.poll_until_terminal(tokens))
                .await
                .map_err(|_| JudgeError::Timeout(deadline))?,
            None => self.poll_until_terminal(tokens).await,
        }
    }
}
