//! Client side of the external code-execution sandbox.
//!
//! Everything numeric or sandbox-specific stays inside this module: callers
//! see [`JudgeVerdict`] and millisecond/kilobyte measurements only.

pub mod client;
pub mod language;
pub mod verdict;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use client::HttpJudgeClient;
pub use language::{Language, resolve_language};
pub use verdict::JudgeVerdict;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge unavailable: {0}")]
    Unavailable(String),

    #[error("judge rate limit exhausted after {attempts} attempts")]
    RateLimitExhausted { attempts: u8 },

    #[error("judge results not ready after {0:?}")]
    Timeout(Duration),

    #[error("unexpected judge response: {0}")]
    Malformed(String),

    #[error("unsupported language '{0}'")]
    UnknownLanguage(String),
}

/// One program execution against one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
    pub expected_output: String,
}

/// Opaque handle the sandbox returns for a queued execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JudgeToken(pub String);

impl JudgeToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of one execution once the sandbox reports on it.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutcome {
    pub verdict: JudgeVerdict,
    /// Sandbox's human-readable status, e.g. "Time Limit Exceeded".
    pub description: Option<String>,
    pub runtime_ms: i64,
    pub memory_kb: i64,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
}

impl JudgeOutcome {
    /// The most specific error text available for a failed execution.
    pub fn error_payload(&self) -> Option<String> {
        [&self.compile_output, &self.stderr]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .or_else(|| self.description.clone())
    }
}

/// Batch dispatch and polling against the sandbox.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Queue every request in one call. No retries at this layer.
    async fn submit_batch(&self, requests: &[JudgeRequest]) -> Result<Vec<JudgeToken>, JudgeError>;

    /// Wait until every token has a terminal verdict; results follow token order.
    async fn poll_results(&self, tokens: &[JudgeToken]) -> Result<Vec<JudgeOutcome>, JudgeError>;
}
