//! Strategy summarizer: turns rejection reasons into a pivot proposal.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use twin_core::SimulationResult;

use crate::oracle::{Oracle, OracleError, OracleRequest};
use crate::prompts::{format_pivot_request, STRATEGIST_SYSTEM_PROMPT};

/// Advice for a product every agent bought
pub const NO_CHANGES_ADVICE: &str = "The product converted every simulated customer. No changes needed.";

/// Placeholder used when no oracle advice can be produced
pub const FALLBACK_ADVICE: &str =
    "Strategy advice is unavailable for this run. Review the rejection reasons in the results table.";

/// Summarizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Maximum rejection notes included in the request
    pub sample_cap: usize,
    pub currency: String,
    pub timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            sample_cap: 20,
            currency: "PLN".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Where a piece of advice came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdviceSource {
    /// Full conversion, nothing to fix
    NotNeeded,
    Oracle,
    Fallback { reason: String },
}

/// Remediation advice for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyAdvice {
    pub text: String,
    pub source: AdviceSource,
}

impl StrategyAdvice {
    fn fallback(reason: impl Into<String>) -> Self {
        Self {
            text: FALLBACK_ADVICE.to_string(),
            source: AdviceSource::Fallback { reason: reason.into() },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AdviceSource::Fallback { .. })
    }
}

pub struct StrategySummarizer {
    oracle: Arc<dyn Oracle>,
    config: SummarizerConfig,
}

impl StrategySummarizer {
    pub fn new(oracle: Arc<dyn Oracle>, config: SummarizerConfig) -> Self {
        Self { oracle, config }
    }

    /// The pivot request for `result`, or `None` when there is nothing to send.
    pub fn pivot_request(&self, result: &SimulationResult) -> Option<OracleRequest> {
        let rejections = &result.metrics.rejections;
        if rejections.is_empty() {
            return None;
        }

        let sample = &rejections[..rejections.len().min(self.config.sample_cap)];
        Some(OracleRequest::text(
            Some(STRATEGIST_SYSTEM_PROMPT.to_string()),
            format_pivot_request(&result.product, &self.config.currency, sample),
        ))
    }

    /// Summarize a run's rejections into advice. Never fails.
    pub async fn summarize(&self, result: &SimulationResult) -> StrategyAdvice {
        if result.metrics.is_full_conversion() {
            return StrategyAdvice {
                text: NO_CHANGES_ADVICE.to_string(),
                source: AdviceSource::NotNeeded,
            };
        }

        let Some(request) = self.pivot_request(result) else {
            tracing::warn!("Run {} has no rejection reasons to summarize", result.run_id);
            return StrategyAdvice::fallback("no rejection reasons were collected");
        };

        tracing::info!(
            "Summarizing {} of {} rejections for run {}",
            result.metrics.rejections.len().min(self.config.sample_cap),
            result.metrics.rejections.len(),
            result.run_id
        );

        let outcome = match tokio::time::timeout(self.config.timeout, self.oracle.complete(&request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(OracleError::Timeout(self.config.timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(text) if !text.trim().is_empty() => StrategyAdvice {
                text: text.trim().to_string(),
                source: AdviceSource::Oracle,
            },
            Ok(_) => {
                tracing::warn!("Strategy oracle returned an empty answer");
                StrategyAdvice::fallback("empty answer")
            }
            Err(e) => {
                tracing::warn!("Strategy oracle failed: {}", e);
                StrategyAdvice::fallback(e.to_string())
            }
        }
    }
}
