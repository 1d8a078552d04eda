//! Result export: per-agent CSV table and JSON run summary.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use twin_agents::StrategyAdvice;
use twin_core::{ProductQuery, Result, RunId, RunStatus, SimulationMetrics, SimulationResult};

/// Column order of the results table
pub const RESULT_COLUMNS: [&str; 12] = [
    "id",
    "name",
    "segment",
    "job",
    "age",
    "income",
    "location",
    "family_size",
    "decision",
    "score",
    "reasoning",
    "key_objection",
];

/// Write one row per evaluated agent, in population order.
pub fn write_results<W: Write>(writer: W, result: &SimulationResult) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(RESULT_COLUMNS)?;

    for row in &result.rows {
        wtr.write_record([
            row.agent_id.to_string(),
            row.name.clone(),
            row.segment.clone(),
            row.job.clone(),
            row.age.to_string(),
            row.income.to_string(),
            row.location.clone(),
            row.family_size.to_string(),
            row.decision().to_string(),
            row.record.score.map(|s| s.to_string()).unwrap_or_default(),
            row.record.reasoning.clone(),
            row.record.key_objection.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_results_csv(path: impl AsRef<Path>, result: &SimulationResult) -> Result<()> {
    write_results(File::create(path.as_ref())?, result)
}

/// JSON document describing a finished run
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub run_id: RunId,
    pub started_at: String,
    pub duration_ms: u64,
    pub oracle: &'a str,
    pub product: &'a ProductQuery,
    pub status: RunStatus,
    pub skipped_rows: usize,
    pub metrics: &'a SimulationMetrics,
    pub advice: Option<&'a StrategyAdvice>,
}

impl<'a> RunSummary<'a> {
    pub fn new(
        result: &'a SimulationResult,
        oracle: &'a str,
        skipped_rows: usize,
        advice: Option<&'a StrategyAdvice>,
    ) -> Self {
        Self {
            run_id: result.run_id,
            started_at: result.started_at.to_datetime().to_rfc3339(),
            duration_ms: result.finished_at.millis_since(result.started_at),
            oracle,
            product: &result.product,
            status: result.status,
            skipped_rows,
            metrics: &result.metrics,
            advice,
        }
    }
}

pub fn write_summary_json(path: impl AsRef<Path>, summary: &RunSummary<'_>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

/// Human-readable digest printed after a run
pub fn render_digest(result: &SimulationResult, advice: Option<&StrategyAdvice>) -> String {
    let m = &result.metrics;
    let mut out = format!(
        "Product: {} ({} per {})\nEvaluated: {} agents ({} buy, {} no buy, {} errors)\nConversion: {:.1}%\nRevenue: {:.2}\n",
        result.product.description(),
        result.product.price(),
        result.product.unit(),
        m.total,
        m.buy_count,
        m.no_buy_count,
        m.error_count,
        m.conversion_pct,
        m.revenue
    );

    if let RunStatus::Cancelled { skipped } = result.status {
        out.push_str(&format!("Cancelled: {} agents not evaluated\n", skipped));
    }
    if let Some(advice) = advice {
        out.push_str(&format!("\nStrategy:\n{}\n", advice.text));
    }
    out
}
