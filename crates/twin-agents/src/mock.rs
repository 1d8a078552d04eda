//! Scripted oracle for tests.
//!
//! Compiled for this crate's tests and, through the `testing` feature, for
//! downstream test suites.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::oracle::{Oracle, OracleRequest, OracleResult};

type Responder = Box<dyn Fn(&OracleRequest) -> OracleResult<String> + Send + Sync>;
type Delay = Box<dyn Fn(&OracleRequest) -> Duration + Send + Sync>;

/// Oracle answering through a closure and recording every request it sees.
pub struct ScriptedOracle {
    respond: Responder,
    delay: Option<Delay>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&OracleRequest) -> OracleResult<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Same answer for every request
    pub fn always(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::new(move |_| Ok(response.clone()))
    }

    /// Sleep before answering, for the duration the closure picks
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&OracleRequest) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &OracleRequest) -> OracleResult<String> {
        self.requests.lock().push(request.clone());

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }

        (self.respond)(request)
    }
}

/// A well-formed decision object as the oracle is expected to return it.
pub fn decision_json(decision: &str, score: f64, reasoning: &str, key_objection: &str) -> String {
    serde_json::json!({
        "decision": decision,
        "score": score,
        "reasoning": reasoning,
        "key_objection": key_objection,
    })
    .to_string()
}
