//! Decision-inference oracle contract and common types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Result type for oracle operations
pub type OracleResult<T> = Result<T, OracleError>;

/// Oracle error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle transport failure: {0}")]
    Transport(String),

    #[error("Oracle returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Oracle contract violation: {0}")]
    ContractViolation(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),
}

/// Expected shape of the oracle's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseFormat {
    /// A single JSON object
    Json,
    /// Free natural-language text
    Text,
}

/// One request to the oracle: a system context plus a user query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub system: Option<String>,
    pub user: String,
    pub format: ResponseFormat,
}

impl OracleRequest {
    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
            format: ResponseFormat::Json,
        }
    }

    pub fn text(system: Option<String>, user: impl Into<String>) -> Self {
        Self {
            system,
            user: user.into(),
            format: ResponseFormat::Text,
        }
    }
}

impl fmt::Display for OracleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(system) = &self.system {
            writeln!(f, "[system]\n{}", system)?;
        }
        write!(f, "[user]\n{}", self.user)
    }
}

/// External decision-inference service
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Oracle name/identifier
    fn name(&self) -> &str;

    /// Answer one request with raw text
    async fn complete(&self, request: &OracleRequest) -> OracleResult<String>;
}

/// Oracle connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// OpenAI-compatible API root, e.g. "https://api.openai.com/v1"
    pub base_url: String,
    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Bearer key; `None` leaves the oracle unconfigured
    pub api_key: Option<String>,
    /// Temperature for generation (0.0-2.0)
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 512,
            timeout_ms: 30_000,
        }
    }
}
