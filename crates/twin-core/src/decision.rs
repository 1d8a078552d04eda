//! Products under evaluation and the decisions agents make about them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Unit used when a product query does not name one.
pub const DEFAULT_UNIT: &str = "piece";

/// A product offer presented to every agent of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    description: String,
    price: f64,
    unit: String,
}

impl ProductQuery {
    pub fn new(description: impl Into<String>, price: f64, unit: Option<&str>) -> Result<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(Error::InvalidInput("product description is empty".to_string()));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(Error::InvalidInput(format!(
                "price must be a non-negative number, got {}",
                price
            )));
        }

        let unit = unit
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT)
            .to_string();

        Ok(Self {
            description,
            price,
            unit,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

/// Purchase decision outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "NO_BUY")]
    NoBuy,
    /// The oracle could not produce a usable decision
    #[serde(rename = "ERROR")]
    Error,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Buy => "BUY",
            Decision::NoBuy => "NO_BUY",
            Decision::Error => "ERROR",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one agent evaluating one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: Decision,
    /// Desirability in [0, 100], best effort
    pub score: Option<f64>,
    pub reasoning: String,
    /// Main objection (or merit) named by the agent
    pub key_objection: Option<String>,
}

impl DecisionRecord {
    pub fn resolved(
        decision: Decision,
        score: Option<f64>,
        reasoning: impl Into<String>,
        key_objection: Option<String>,
    ) -> Self {
        Self {
            decision,
            score: score.filter(|s| (0.0..=100.0).contains(s)),
            reasoning: reasoning.into(),
            key_objection,
        }
    }

    /// Record standing in for a failed evaluation; `reasoning` carries the failure.
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            decision: Decision::Error,
            score: None,
            reasoning: description.into(),
            key_objection: None,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.decision == Decision::Buy
    }

    pub fn is_error(&self) -> bool {
        self.decision == Decision::Error
    }
}
