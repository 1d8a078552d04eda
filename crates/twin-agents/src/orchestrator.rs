//! Simulation orchestrator running one product across a whole population.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use twin_core::{
    AgentId, Decision, DecisionRecord, Error, Population, ProductQuery, Result, RunId, RunStatus,
    SimulationResult, SimulationRow, Timestamp,
};

use crate::consumer::{EvaluateProduct, EvaluationSettings};
use crate::oracle::Oracle;

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum oracle calls in flight
    pub max_concurrency: usize,
    pub evaluation: EvaluationSettings,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            evaluation: EvaluationSettings::default(),
        }
    }
}

/// Cooperative cancellation shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notifications emitted while a run is in flight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProgressEvent {
    Started {
        run_id: RunId,
        total: usize,
    },
    AgentEvaluated {
        /// Position in the population
        index: usize,
        agent_id: AgentId,
        name: String,
        decision: Decision,
        completed: usize,
        total: usize,
    },
    Finished {
        run_id: RunId,
        status: RunStatus,
    },
}

/// Caller-side hooks for a run
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    pub cancel: CancellationFlag,
}

impl RunControl {
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn notify(&self, event: ProgressEvent) {
        if let Some(tx) = &self.progress {
            // a dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }
}

/// Drives per-agent evaluations and aggregates them into a result
pub struct SimulationOrchestrator {
    oracle: Arc<dyn Oracle>,
    config: OrchestratorConfig,
}

impl SimulationOrchestrator {
    pub fn new(oracle: Arc<dyn Oracle>, config: OrchestratorConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Evaluate `product` across the whole population
    pub async fn run(&self, population: &Population, product: &ProductQuery) -> Result<SimulationResult> {
        self.run_with(population, product, RunControl::default()).await
    }

    /// Evaluate with progress reporting and cancellation.
    ///
    /// Agents are evaluated concurrently, at most `max_concurrency` at a
    /// time; rows come back in population order whatever the completion
    /// order. After cancellation no new evaluation starts, the ones in flight
    /// finish, and the partial result covers evaluated agents only.
    pub async fn run_with(
        &self,
        population: &Population,
        product: &ProductQuery,
        control: RunControl,
    ) -> Result<SimulationResult> {
        let run_id = RunId::new();
        let started_at = Timestamp::now();
        let total = population.len();

        tracing::info!(
            "Run {}: evaluating {:?} at {} across {} agents",
            run_id,
            product.description(),
            product.price(),
            total
        );
        control.notify(ProgressEvent::Started { run_id, total });

        let oracle = self.oracle.as_ref();
        let settings = &self.config.evaluation;
        let cancel = &control.cancel;

        let mut evaluations = stream::iter(population.iter().enumerate())
            .map(|(index, agent)| async move {
                if cancel.is_cancelled() {
                    return (index, None);
                }
                let record = agent.evaluate_product(product, oracle, settings).await;
                (index, Some(record))
            })
            .buffer_unordered(self.config.max_concurrency.max(1));

        let mut slots: Vec<Option<DecisionRecord>> = vec![None; total];
        let mut completed = 0;

        while let Some((index, record)) = evaluations.next().await {
            let Some(record) = record else { continue };
            completed += 1;

            let agent = &population.agents()[index];
            control.notify(ProgressEvent::AgentEvaluated {
                index,
                agent_id: agent.id,
                name: agent.name.clone(),
                decision: record.decision,
                completed,
                total,
            });
            slots[index] = Some(record);
        }

        let rows: Vec<SimulationRow> = population
            .iter()
            .zip(slots)
            .filter_map(|(agent, slot)| slot.map(|record| SimulationRow::new(agent, record)))
            .collect();

        let skipped = total - rows.len();
        let status = if skipped == 0 {
            RunStatus::Completed
        } else {
            RunStatus::Cancelled { skipped }
        };

        if rows.is_empty() {
            tracing::warn!("Run {} cancelled before any agent was evaluated", run_id);
            control.notify(ProgressEvent::Finished { run_id, status });
            return Err(Error::Cancelled);
        }

        let result = SimulationResult::new(run_id, started_at, product.clone(), rows, status)?;

        tracing::info!(
            "Run {} {:?}: {}/{} bought ({:.1}%), {} errors, revenue {:.2}",
            run_id,
            status,
            result.metrics.buy_count,
            result.metrics.total,
            result.metrics.conversion_pct,
            result.metrics.error_count,
            result.metrics.revenue
        );
        control.notify(ProgressEvent::Finished { run_id, status });

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{decision_json, ScriptedOracle};
    use crate::oracle::OracleRequest;
    use std::time::Duration;
    use twin_core::{ConsumerAgent, MarketSegment, PersonalityTraits};

    fn population(n: u64) -> Population {
        let agents = (1..=n)
            .map(|i| {
                ConsumerAgent::new(
                    AgentId(i),
                    format!("Agent {}", i),
                    MarketSegment::GenZStudent,
                    PersonalityTraits::neutral(),
                    2_000 + i * 100,
                    20,
                    "Student",
                    "Poznań",
                    1,
                )
                .unwrap()
            })
            .collect();
        Population::new(agents).unwrap()
    }

    fn agent_number(request: &OracleRequest) -> u64 {
        let system = request.system.as_deref().unwrap_or_default();
        let start = system.find("Name: Agent ").map(|i| i + "Name: Agent ".len()).unwrap();
        let digits: String = system[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().unwrap()
    }

    fn product() -> ProductQuery {
        ProductQuery::new("Language learning app subscription", 49.0, Some("month")).unwrap()
    }

    #[tokio::test]
    async fn test_orchestrator_aggregates() {
        let oracle = Arc::new(ScriptedOracle::new(|request| {
            let decision = if agent_number(request) % 2 == 0 { "BUY" } else { "NO_BUY" };
            Ok(decision_json(decision, 60.0, "because", "price"))
        }));
        let orchestrator = SimulationOrchestrator::new(oracle.clone(), OrchestratorConfig::default());

        let result = orchestrator.run(&population(6), &product()).await.unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.rows.len(), 6);
        assert_eq!(result.metrics.buy_count, 3);
        assert_eq!(result.metrics.conversion_pct, 50.0);
        assert_eq!(result.metrics.revenue, 147.0);
        assert_eq!(result.metrics.rejections.len(), 3);
        assert_eq!(oracle.call_count(), 6);
    }

    #[tokio::test]
    async fn test_one_malformed_answer_yields_one_error_row_in_order() {
        let oracle = Arc::new(ScriptedOracle::new(|request| {
            if agent_number(request) == 3 {
                Ok("I'm not sure, maybe?".to_string())
            } else {
                Ok(decision_json("NO_BUY", 40.0, "not for me", "price"))
            }
        }));
        let orchestrator = SimulationOrchestrator::new(oracle, OrchestratorConfig::default());

        let result = orchestrator.run(&population(5), &product()).await.unwrap();

        let decisions: Vec<Decision> = result.rows.iter().map(|r| r.decision()).collect();
        assert_eq!(
            decisions,
            vec![
                Decision::NoBuy,
                Decision::NoBuy,
                Decision::Error,
                Decision::NoBuy,
                Decision::NoBuy
            ]
        );
        let ids: Vec<u64> = result.rows.iter().map(|r| r.agent_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(result.metrics.error_count, 1);
        assert_eq!(result.metrics.total, 5);
        assert_eq!(result.metrics.rejections.len(), 4);
    }

    #[tokio::test]
    async fn test_rows_follow_population_order_despite_completion_order() {
        // earlier agents answer last
        let oracle = Arc::new(
            ScriptedOracle::new(|request| {
                let n = agent_number(request);
                let decision = if n == 1 { "BUY" } else { "NO_BUY" };
                Ok(decision_json(decision, 50.0, &format!("agent {}", n), "none"))
            })
            .with_delay(|request| Duration::from_millis(10 * (9 - agent_number(request)))),
        );
        let config = OrchestratorConfig {
            max_concurrency: 8,
            ..OrchestratorConfig::default()
        };
        let orchestrator = SimulationOrchestrator::new(oracle, config);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let control = RunControl::default().with_progress(tx);
        let result = orchestrator.run_with(&population(8), &product(), control).await.unwrap();

        let reasons: Vec<&str> = result.rows.iter().map(|r| r.record.reasoning.as_str()).collect();
        assert_eq!(
            reasons,
            (1..=8).map(|n| format!("agent {}", n)).collect::<Vec<_>>()
        );
        assert_eq!(result.rows[0].decision(), Decision::Buy);

        let mut evaluated_order = Vec::new();
        let mut finished = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                ProgressEvent::AgentEvaluated { agent_id, completed, total, .. } => {
                    assert_eq!(total, 8);
                    assert_eq!(completed, evaluated_order.len() + 1);
                    evaluated_order.push(agent_id.0);
                }
                ProgressEvent::Finished { status, .. } => {
                    assert_eq!(status, RunStatus::Completed);
                    finished = true;
                }
                ProgressEvent::Started { total, .. } => assert_eq!(total, 8),
            }
        }
        assert!(finished);
        assert_eq!(evaluated_order.len(), 8);
        assert_ne!(evaluated_order, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        use std::sync::atomic::AtomicUsize;

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        struct CountingOracle {
            in_flight: Arc<AtomicUsize>,
            peak: Arc<AtomicUsize>,
        }

        #[async_trait::async_trait]
        impl Oracle for CountingOracle {
            fn name(&self) -> &str {
                "counting"
            }

            async fn complete(&self, _request: &OracleRequest) -> crate::oracle::OracleResult<String> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(decision_json("BUY", 70.0, "fine", "none"))
            }
        }

        let oracle = Arc::new(CountingOracle {
            in_flight: in_flight.clone(),
            peak: peak.clone(),
        });
        let config = OrchestratorConfig {
            max_concurrency: 3,
            ..OrchestratorConfig::default()
        };
        let result = SimulationOrchestrator::new(oracle, config)
            .run(&population(12), &product())
            .await
            .unwrap();

        assert_eq!(result.metrics.buy_count, 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial_result() {
        let cancel = CancellationFlag::new();
        let trigger = cancel.clone();
        let oracle = Arc::new(ScriptedOracle::new(move |request| {
            if agent_number(request) == 2 {
                trigger.cancel();
            }
            Ok(decision_json("BUY", 75.0, "yes", "none"))
        }));
        let config = OrchestratorConfig {
            max_concurrency: 1,
            ..OrchestratorConfig::default()
        };
        let orchestrator = SimulationOrchestrator::new(oracle.clone(), config);

        let control = RunControl::default().with_cancel(cancel);
        let result = orchestrator.run_with(&population(5), &product(), control).await.unwrap();

        assert_eq!(result.status, RunStatus::Cancelled { skipped: 3 });
        assert!(result.is_cancelled());
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.metrics.total, 2);
        assert_eq!(result.metrics.conversion_pct, 100.0);
        assert_eq!(oracle.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_is_an_error() {
        let oracle = Arc::new(ScriptedOracle::always(decision_json("BUY", 75.0, "yes", "none")));
        let orchestrator = SimulationOrchestrator::new(oracle.clone(), OrchestratorConfig::default());

        let cancel = CancellationFlag::new();
        cancel.cancel();
        let result = orchestrator
            .run_with(&population(3), &product(), RunControl::default().with_cancel(cancel))
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_timeouts_do_not_stall_the_run() {
        let oracle = Arc::new(
            ScriptedOracle::always(decision_json("BUY", 75.0, "yes", "none")).with_delay(|request| {
                if agent_number(request) == 2 {
                    Duration::from_secs(10)
                } else {
                    Duration::ZERO
                }
            }),
        );
        let config = OrchestratorConfig {
            max_concurrency: 4,
            evaluation: EvaluationSettings {
                timeout: Duration::from_millis(50),
                ..EvaluationSettings::default()
            },
        };

        let result = SimulationOrchestrator::new(oracle, config)
            .run(&population(3), &product())
            .await
            .unwrap();

        assert_eq!(result.rows[1].decision(), Decision::Error);
        assert_eq!(result.metrics.buy_count, 2);
        assert_eq!(result.metrics.error_count, 1);
    }
}
