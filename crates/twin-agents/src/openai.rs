//! OpenAI-compatible chat-completions oracle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::oracle::{Oracle, OracleConfig, OracleError, OracleRequest, OracleResult, ResponseFormat};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatSpec>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormatSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Oracle backed by a `/chat/completions` endpoint
#[derive(Debug)]
pub struct ChatCompletionsOracle {
    client: reqwest::Client,
    config: OracleConfig,
    api_key: String,
    endpoint: String,
}

impl ChatCompletionsOracle {
    pub fn new(config: OracleConfig) -> OracleResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OracleError::NotConfigured("no API key provided".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| OracleError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_key,
            config,
        })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn build_body<'a>(&'a self, request: &'a OracleRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user,
        });

        ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: match request.format {
                ResponseFormat::Json => Some(ResponseFormatSpec { kind: "json_object" }),
                ResponseFormat::Text => None,
            },
        }
    }
}

#[async_trait]
impl Oracle for ChatCompletionsOracle {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &OracleRequest) -> OracleResult<String> {
        let body = self.build_body(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.config.timeout_ms)
                } else {
                    OracleError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimit);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::ContractViolation(format!("malformed completion: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| OracleError::ContractViolation("completion has no content".to_string()))
    }
}
