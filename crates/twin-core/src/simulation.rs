//! Simulation results and aggregate market metrics.

use serde::Serialize;

use crate::agent::ConsumerAgent;
use crate::decision::{Decision, DecisionRecord, ProductQuery};
use crate::error::{Error, Result};
use crate::types::{AgentId, RunId, Timestamp};

/// One agent's demographics joined with its decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRow {
    pub agent_id: AgentId,
    pub name: String,
    pub segment: String,
    pub job: String,
    pub age: u32,
    pub income: u64,
    pub location: String,
    pub family_size: u32,
    pub record: DecisionRecord,
}

impl SimulationRow {
    pub fn new(agent: &ConsumerAgent, record: DecisionRecord) -> Self {
        Self {
            agent_id: agent.id,
            name: agent.name.clone(),
            segment: agent.segment.label().to_string(),
            job: agent.job.clone(),
            age: agent.age,
            income: agent.income,
            location: agent.location.clone(),
            family_size: agent.family_size,
            record,
        }
    }

    pub fn decision(&self) -> Decision {
        self.record.decision
    }
}

/// A rejection rationale tagged for strategy summarization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionNote {
    pub name: String,
    pub segment: String,
    pub job: String,
    pub age: u32,
    pub reasoning: String,
}

impl RejectionNote {
    fn from_row(row: &SimulationRow) -> Self {
        Self {
            name: row.name.clone(),
            segment: row.segment.clone(),
            job: row.job.clone(),
            age: row.age,
            reasoning: row.record.reasoning.clone(),
        }
    }
}

/// Aggregate metrics over the evaluated rows.
///
/// Error rows stay in the denominator: `total` is the number of evaluated
/// agents, whatever their outcome, and `error_count` is reported alongside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationMetrics {
    pub buy_count: usize,
    pub no_buy_count: usize,
    pub error_count: usize,
    pub total: usize,
    /// 100 * buy_count / total
    pub conversion_pct: f64,
    /// buy_count * price
    pub revenue: f64,
    pub rejections: Vec<RejectionNote>,
}

impl SimulationMetrics {
    pub fn compute(rows: &[SimulationRow], price: f64) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::NothingEvaluated);
        }

        let mut buy_count = 0;
        let mut no_buy_count = 0;
        let mut error_count = 0;
        let mut rejections = Vec::new();

        for row in rows {
            match row.decision() {
                Decision::Buy => buy_count += 1,
                Decision::NoBuy => {
                    no_buy_count += 1;
                    rejections.push(RejectionNote::from_row(row));
                }
                Decision::Error => error_count += 1,
            }
        }

        let total = rows.len();

        Ok(Self {
            buy_count,
            no_buy_count,
            error_count,
            total,
            conversion_pct: 100.0 * buy_count as f64 / total as f64,
            revenue: buy_count as f64 * price,
            rejections,
        })
    }

    pub fn is_full_conversion(&self) -> bool {
        self.buy_count == self.total
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Cancelled cooperatively; `skipped` agents were never evaluated
    Cancelled { skipped: usize },
}

/// Complete output of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub run_id: RunId,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub product: ProductQuery,
    pub status: RunStatus,
    /// Rows in population order
    pub rows: Vec<SimulationRow>,
    pub metrics: SimulationMetrics,
}

impl SimulationResult {
    pub fn new(
        run_id: RunId,
        started_at: Timestamp,
        product: ProductQuery,
        rows: Vec<SimulationRow>,
        status: RunStatus,
    ) -> Result<Self> {
        let metrics = SimulationMetrics::compute(&rows, product.price())?;

        Ok(Self {
            run_id,
            started_at,
            finished_at: Timestamp::now(),
            product,
            status,
            rows,
            metrics,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, RunStatus::Cancelled { .. })
    }
}
