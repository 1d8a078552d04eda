//! Prompt templates and oracle response parsing.

use serde::Deserialize;
use serde_json::Value;
use twin_core::{ConsumerAgent, Decision, DecisionRecord, ProductQuery, RejectionNote};

use crate::oracle::{OracleError, OracleResult};

/// Instructions appended to every product query
pub const DECISION_INSTRUCTIONS: &str = r#"Respond strictly with a single JSON object and nothing else:
{
    "decision": "BUY" or "NO_BUY",
    "score": a number from 0 to 100 describing how desirable the offer is to you,
    "reasoning": "a short justification in your own voice",
    "key_objection": "the main obstacle, or the main merit if you buy"
}"#;

/// System prompt for the strategy consultant
pub const STRATEGIST_SYSTEM_PROMPT: &str = r#"You are a product strategy consultant. You read rejection reasons collected from simulated customers and propose how to reposition the product.

Be concrete and brief. Answer in plain text without markdown formatting, lists or headings."#;

/// Persona statement for one agent.
///
/// Built only from the agent's own fields, so the same agent always yields
/// the same text.
pub fn format_persona_statement(agent: &ConsumerAgent, currency: &str) -> String {
    let traits = agent
        .traits
        .decision_relevant()
        .iter()
        .map(|(t, v)| format!("{} {:.2}", t.name(), v))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a simulated consumer.
Name: {}, Age: {}, Job: {}, Location: {}.
Income: {} {} per month. Household size: {}.
Market segment: {}.
Personality traits (0-1): {}.
Decide realistically, the way this person would spend their own money."#,
        agent.name,
        agent.age,
        agent.job,
        agent.location,
        agent.income,
        currency,
        agent.family_size,
        agent.segment.label(),
        traits
    )
}

/// Product query sent alongside the persona statement
pub fn format_product_query(product: &ProductQuery, currency: &str) -> String {
    format!(
        r#"=== PRODUCT OFFER ===

Product: {}
Price: {} {} per {}

{}"#,
        product.description(),
        product.price(),
        currency,
        product.unit(),
        DECISION_INSTRUCTIONS
    )
}

/// Pivot request compiled from a sample of rejections
pub fn format_pivot_request(
    product: &ProductQuery,
    currency: &str,
    rejections: &[RejectionNote],
) -> String {
    let reasons = rejections
        .iter()
        .map(|r| format!("- {} ({}, {}, {}): {}", r.name, r.segment, r.job, r.age, r.reasoning))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"=== PRODUCT PIVOT ===

Product: "{}" ({} {} per {})

Reasons customers gave for not buying:
{}

Propose exactly one concrete change to the product (a pivot) and a new product name."#,
        product.description(),
        product.price(),
        currency,
        product.unit(),
        reasons
    )
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    decision: Option<String>,
    #[serde(default)]
    score: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    key_objection: Option<Value>,
}

/// Parse the oracle's decision object.
///
/// Tolerates code fences or prose around the object; a missing or
/// unrecognized `decision` is a contract violation.
pub fn parse_decision(response: &str) -> OracleResult<DecisionRecord> {
    let body = extract_json_object(response).ok_or_else(|| {
        OracleError::ContractViolation(format!("response is not a JSON object: {:?}", preview(response)))
    })?;

    let raw: RawDecision = serde_json::from_str(body)
        .map_err(|e| OracleError::ContractViolation(format!("malformed decision object: {}", e)))?;

    let label = raw
        .decision
        .ok_or_else(|| OracleError::ContractViolation("missing `decision` field".to_string()))?;

    let decision = match normalize_label(&label).as_str() {
        "BUY" => Decision::Buy,
        "NO_BUY" => Decision::NoBuy,
        _ => {
            return Err(OracleError::ContractViolation(format!(
                "unrecognized decision {:?}",
                label
            )))
        }
    };

    let score = raw.score.as_ref().and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    let key_objection = raw
        .key_objection
        .and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|s| !s.trim().is_empty());

    Ok(DecisionRecord::resolved(
        decision,
        score,
        raw.reasoning.unwrap_or_default(),
        key_objection,
    ))
}

fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

fn normalize_label(label: &str) -> String {
    label.trim().to_uppercase().replace([' ', '-'], "_")
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use twin_core::{AgentId, MarketSegment, PersonalityTraits};

    fn agent() -> ConsumerAgent {
        ConsumerAgent::new(
            AgentId(7),
            "Maria Zielińska",
            MarketSegment::SeniorCitizen,
            PersonalityTraits::new(0.25, 0.9, 0.3, 0.675, 0.8).unwrap(),
            3_400,
            71,
            "Retired Teacher",
            "Village (Subcarpathia)",
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_persona_statement_fields() {
        let persona = format_persona_statement(&agent(), "PLN");

        assert!(persona.contains("Name: Maria Zielińska, Age: 71"));
        assert!(persona.contains("Job: Retired Teacher"));
        assert!(persona.contains("Location: Village (Subcarpathia)"));
        assert!(persona.contains("Income: 3400 PLN"));
        assert!(persona.contains("Household size: 2"));
        assert!(persona.contains("Market segment: Senior Citizen"));
        assert!(persona.contains("Openness 0.25, Conscientiousness 0.90, Agreeableness"));
        assert!(!persona.contains("Neuroticism"));
    }

    #[test]
    fn test_persona_statement_is_deterministic() {
        assert_eq!(
            format_persona_statement(&agent(), "PLN"),
            format_persona_statement(&agent(), "PLN")
        );
    }

    #[test]
    fn test_product_query() {
        let product = ProductQuery::new("Crypto investing masterclass", 2500.0, None).unwrap();
        let query = format_product_query(&product, "PLN");
        assert!(query.contains("Product: Crypto investing masterclass"));
        assert!(query.contains("Price: 2500 PLN per piece"));
        assert!(query.contains("\"decision\": \"BUY\" or \"NO_BUY\""));
    }

    #[test]
    fn test_parse_decision() {
        let record = parse_decision(
            r#"{"decision": "NO_BUY", "score": 22, "reasoning": "Too expensive on a pension", "key_objection": "Price"}"#,
        )
        .unwrap();

        assert_eq!(record.decision, Decision::NoBuy);
        assert_eq!(record.score, Some(22.0));
        assert_eq!(record.reasoning, "Too expensive on a pension");
        assert_eq!(record.key_objection.as_deref(), Some("Price"));
    }

    #[test]
    fn test_parse_decision_lenient_envelope() {
        let response = "```json\n{\"decision\": \"buy\", \"score\": \"87\", \"reasoning\": \"Useful\"}\n```";
        let record = parse_decision(response).unwrap();
        assert_eq!(record.decision, Decision::Buy);
        assert_eq!(record.score, Some(87.0));
        assert_eq!(record.key_objection, None);

        let record = parse_decision(r#"{"decision": "No Buy", "reasoning": "Meh"}"#).unwrap();
        assert_eq!(record.decision, Decision::NoBuy);
        assert_eq!(record.score, None);
    }

    #[test]
    fn test_parse_decision_contract_violations() {
        for response in [
            "I would probably buy it.",
            r#"{"score": 50, "reasoning": "no decision"}"#,
            r#"{"decision": "MAYBE"}"#,
            r#"{"decision": 1}"#,
            "{ not json }",
        ] {
            assert!(
                matches!(parse_decision(response), Err(OracleError::ContractViolation(_))),
                "accepted {:?}",
                response
            );
        }
    }

    #[test]
    fn test_pivot_request_lists_tagged_reasons() {
        let product = ProductQuery::new("Smart kettle", 399.0, None).unwrap();
        let notes = vec![RejectionNote {
            name: "Jan Nowak".to_string(),
            segment: "Senior Citizen".to_string(),
            job: "Retiree".to_string(),
            age: 77,
            reasoning: "I boil water on the stove".to_string(),
        }];

        let request = format_pivot_request(&product, "PLN", &notes);
        assert!(request.contains("\"Smart kettle\" (399 PLN per piece)"));
        assert!(request.contains("- Jan Nowak (Senior Citizen, Retiree, 77): I boil water on the stove"));
        assert!(request.contains("new product name"));
    }
}
