//! Per-agent decision protocol: one consumer evaluating one product.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use twin_core::{ConsumerAgent, DecisionRecord, ProductQuery};

use crate::oracle::{Oracle, OracleError, OracleRequest};
use crate::prompts::{format_persona_statement, format_product_query, parse_decision};

/// Settings shared by every evaluation of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Currency quoted for incomes and prices
    pub currency: String,
    /// Upper bound on a single oracle round-trip
    pub timeout: Duration,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            currency: "PLN".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// The oracle request for `agent` evaluating `product`. Pure.
pub fn decision_request(
    agent: &ConsumerAgent,
    product: &ProductQuery,
    currency: &str,
) -> OracleRequest {
    OracleRequest::json(
        format_persona_statement(agent, currency),
        format_product_query(product, currency),
    )
}

/// Product evaluation exposed on consumer agents.
#[async_trait]
pub trait EvaluateProduct {
    /// Ask the oracle for this agent's purchase decision.
    ///
    /// Never fails: transport errors, timeouts and malformed answers come
    /// back as a `Decision::Error` record carrying the failure description.
    async fn evaluate_product(
        &self,
        product: &ProductQuery,
        oracle: &dyn Oracle,
        settings: &EvaluationSettings,
    ) -> DecisionRecord;
}

#[async_trait]
impl EvaluateProduct for ConsumerAgent {
    async fn evaluate_product(
        &self,
        product: &ProductQuery,
        oracle: &dyn Oracle,
        settings: &EvaluationSettings,
    ) -> DecisionRecord {
        let request = decision_request(self, product, &settings.currency);

        tracing::debug!("Consulting {} for agent {} ({})", oracle.name(), self.id, self.name);

        let outcome = match tokio::time::timeout(settings.timeout, oracle.complete(&request)).await {
            Ok(Ok(response)) => parse_decision(&response),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(OracleError::Timeout(settings.timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(record) => {
                tracing::debug!("Agent {} decided {}", self.id, record.decision);
                record
            }
            Err(e) => {
                tracing::warn!("Oracle failed for agent {} ({}): {}", self.id, self.name, e);
                DecisionRecord::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{decision_json, ScriptedOracle};
    use twin_core::{AgentId, Decision, MarketSegment, PersonalityTraits};

    fn agent() -> ConsumerAgent {
        ConsumerAgent::new(
            AgentId(1),
            "Kamil Mazur",
            MarketSegment::TechEarlyAdopter,
            PersonalityTraits::new(0.9, 0.4, 0.7, 0.5, 0.2).unwrap(),
            18_000,
            31,
            "AI Engineer",
            "Wrocław",
            1,
        )
        .unwrap()
    }

    fn product() -> ProductQuery {
        ProductQuery::new("Noise-cancelling headphones", 1299.0, None).unwrap()
    }

    #[tokio::test]
    async fn test_evaluate_product_buy() {
        let oracle = ScriptedOracle::always(decision_json("BUY", 91.0, "Great for focus", "Battery life"));
        let record = agent()
            .evaluate_product(&product(), &oracle, &EvaluationSettings::default())
            .await;

        assert_eq!(record.decision, Decision::Buy);
        assert_eq!(record.score, Some(91.0));
        assert_eq!(record.key_objection.as_deref(), Some("Battery life"));

        let requests = oracle.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system.as_deref().unwrap().contains("Name: Kamil Mazur"));
        assert!(requests[0].user.contains("Noise-cancelling headphones"));
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_record() {
        let oracle = ScriptedOracle::new(|_| Err(OracleError::Transport("connection refused".into())));
        let record = agent()
            .evaluate_product(&product(), &oracle, &EvaluationSettings::default())
            .await;

        assert_eq!(record.decision, Decision::Error);
        assert!(record.reasoning.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_malformed_answer_becomes_error_record() {
        let oracle = ScriptedOracle::always("Sure, I'd buy it!");
        let record = agent()
            .evaluate_product(&product(), &oracle, &EvaluationSettings::default())
            .await;

        assert!(record.is_error());
        assert!(record.reasoning.contains("contract violation"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_record() {
        let oracle = ScriptedOracle::always(decision_json("BUY", 80.0, "ok", "none"))
            .with_delay(|_| Duration::from_secs(5));
        let settings = EvaluationSettings {
            timeout: Duration::from_millis(20),
            ..EvaluationSettings::default()
        };

        let record = agent().evaluate_product(&product(), &oracle, &settings).await;
        assert!(record.is_error());
        assert!(record.reasoning.contains("Timeout after 20ms"));
    }

    #[tokio::test]
    async fn test_repeated_evaluations_send_identical_prompts() {
        let oracle = ScriptedOracle::always(decision_json("NO_BUY", 30.0, "Have some", "Price"));
        let agent = agent();
        let settings = EvaluationSettings::default();

        agent.evaluate_product(&product(), &oracle, &settings).await;
        agent.evaluate_product(&product(), &oracle, &settings).await;

        let requests = oracle.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].system, requests[1].system);
        assert_eq!(requests[0].user.as_bytes(), requests[1].user.as_bytes());
        assert_eq!(requests[0], decision_request(&agent, &product(), "PLN"));
    }
}
