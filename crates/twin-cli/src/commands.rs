//! Subcommand implementations.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use twin_agents::{
    CancellationFlag, ChatCompletionsOracle, Oracle, ProgressEvent, RunControl,
    SimulationOrchestrator, StrategySummarizer,
};
use twin_core::ProductQuery;
use twin_population::{
    generate_reference_datasets, load_population, synthesize_cohort, write_population_csv,
    DemographicTables, TargetedCohort,
};

use crate::config::TwinConfig;
use crate::report::{render_digest, write_results_csv, write_summary_json, RunSummary};

pub struct SimulateArgs {
    pub population: PathBuf,
    pub product: String,
    pub price: f64,
    pub unit: Option<String>,
    pub output: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub no_summary: bool,
    pub concurrency: Option<usize>,
}

pub async fn simulate(config: &TwinConfig, args: SimulateArgs) -> Result<()> {
    let oracle: Arc<dyn Oracle> = Arc::new(
        ChatCompletionsOracle::new(config.oracle.clone())
            .context("Decision oracle is not available")?,
    );
    simulate_with(config, args, oracle).await
}

/// Run `simulate` against an already constructed oracle.
pub async fn simulate_with(
    config: &TwinConfig,
    args: SimulateArgs,
    oracle: Arc<dyn Oracle>,
) -> Result<()> {
    let report = load_population(&args.population)
        .with_context(|| format!("Failed to read population {}", args.population.display()))?;
    let skipped_rows = report.diagnostics.len();
    if skipped_rows > 0 {
        println!("Skipped {} malformed rows in {}", skipped_rows, args.population.display());
    }
    let population = report
        .into_population()
        .with_context(|| format!("No usable agents in {}", args.population.display()))?;

    let unit = args
        .unit
        .as_deref()
        .unwrap_or(config.simulation.default_unit.as_str());
    let product = ProductQuery::new(args.product, args.price, Some(unit))?;

    let mut orchestrator_config = config.orchestrator();
    if let Some(n) = args.concurrency {
        orchestrator_config.max_concurrency = n;
    }
    let orchestrator = SimulationOrchestrator::new(oracle.clone(), orchestrator_config);

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing evaluations in flight");
            on_interrupt.cancel();
        }
    });

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            if let ProgressEvent::AgentEvaluated {
                name,
                decision,
                completed,
                total,
                ..
            } = event
            {
                tracing::debug!("[{}/{}] {} -> {}", completed, total, name, decision);
            }
        }
    });

    let control = RunControl::default().with_progress(progress_tx).with_cancel(cancel);
    let result = orchestrator.run_with(&population, &product, control).await?;
    // the sender was moved into `control`, so the task ends once the run does
    let _ = progress.await;

    let advice = if config.summary.enabled && !args.no_summary {
        let summarizer = StrategySummarizer::new(oracle.clone(), config.summarizer());
        Some(summarizer.summarize(&result).await)
    } else {
        None
    };

    print!("{}", render_digest(&result, advice.as_ref()));

    if let Some(path) = &args.output {
        write_results_csv(path, &result)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        println!("Results written to {}", path.display());
    }
    if let Some(path) = &args.summary {
        let summary = RunSummary::new(&result, oracle.name(), skipped_rows, advice.as_ref());
        write_summary_json(path, &summary)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        println!("Summary written to {}", path.display());
    }

    Ok(())
}

pub struct SynthesizeArgs {
    pub count: usize,
    pub job: String,
    pub min_age: u32,
    pub max_age: u32,
    pub locations: String,
    pub seed: Option<u64>,
    pub output: PathBuf,
    pub tables: Option<PathBuf>,
}

pub fn synthesize(args: SynthesizeArgs) -> Result<()> {
    let tables = load_tables(args.tables.as_deref())?;
    let cohort = TargetedCohort::new(args.count, args.job, args.min_age, args.max_age, &args.locations)?;
    let population = synthesize_cohort(&cohort, &tables, args.seed)?;

    write_population_csv(&args.output, population.agents())
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Synthesized {} agents into {}", population.len(), args.output.display());
    Ok(())
}

pub struct GenerateArgs {
    pub sizes: Option<Vec<usize>>,
    pub output_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub tables: Option<PathBuf>,
}

pub fn generate_datasets(config: &TwinConfig, args: GenerateArgs) -> Result<()> {
    let tables = load_tables(args.tables.as_deref())?;
    let sizes = args.sizes.unwrap_or_else(|| config.generation.sizes.clone());
    let dir = args
        .output_dir
        .unwrap_or_else(|| config.generation.output_dir.clone());
    let seed = args.seed.or(config.generation.seed);

    let written = generate_reference_datasets(&dir, &sizes, &tables, seed)
        .with_context(|| format!("Failed to generate datasets in {}", dir.display()))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn load_tables(path: Option<&Path>) -> Result<DemographicTables> {
    match path {
        Some(path) => DemographicTables::from_json_file(path)
            .with_context(|| format!("Failed to load demographic tables from {}", path.display())),
        None => Ok(DemographicTables::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twin_population::load_population;

    #[test]
    fn test_synthesize_writes_loadable_population() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cohort.csv");

        synthesize(SynthesizeArgs {
            count: 12,
            job: "Nurse".to_string(),
            min_age: 25,
            max_age: 40,
            locations: "Gdańsk, Łódź".to_string(),
            seed: Some(7),
            output: output.clone(),
            tables: None,
        })
        .unwrap();

        let report = load_population(&output).unwrap();
        assert!(report.diagnostics.is_empty());
        let population = report.into_population().unwrap();
        assert_eq!(population.len(), 12);
        assert!(population.iter().all(|a| a.job == "Nurse" && (25..=40).contains(&a.age)));
    }

    #[test]
    fn test_generate_datasets_uses_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TwinConfig::default();
        config.generation.sizes = vec![5, 10];
        config.generation.output_dir = dir.path().to_path_buf();

        generate_datasets(
            &config,
            GenerateArgs {
                sizes: None,
                output_dir: None,
                seed: Some(1),
                tables: None,
            },
        )
        .unwrap();

        assert!(dir.path().join("population_5.csv").exists());
        assert!(dir.path().join("population_10.csv").exists());
    }

    #[tokio::test]
    async fn test_simulate_writes_results_and_summary() {
        use twin_agents::{decision_json, OracleRequest, ResponseFormat, ScriptedOracle};

        let dir = tempfile::tempdir().unwrap();
        let population = dir.path().join("population.csv");
        std::fs::write(
            &population,
            "id,name,segment,income\n\
             1,Anna Nowak,Gen Z Student,2500\n\
             2,Jan Mazur,Senior Citizen,3100\n\
             3,Ewa Wójcik,Corporate Professional,14000\n\
             oops,Broken Row,Gen Z Student,2000\n",
        )
        .unwrap();
        let output = dir.path().join("results.csv");
        let summary = dir.path().join("summary.json");

        let oracle = Arc::new(ScriptedOracle::new(|request: &OracleRequest| {
            if request.format == ResponseFormat::Text {
                return Ok("Rename it \"Commuter Pass\" and add a weekly option.".to_string());
            }
            let system = request.system.as_deref().unwrap_or_default();
            if system.contains("Name: Jan Mazur") {
                Ok(decision_json("NO_BUY", 20.0, "I rarely travel", "Price"))
            } else {
                Ok(decision_json("BUY", 80.0, "Handy", "None"))
            }
        }));

        simulate_with(
            &TwinConfig::default(),
            SimulateArgs {
                population,
                product: "Monthly tram pass".to_string(),
                price: 110.0,
                unit: Some("month".to_string()),
                output: Some(output.clone()),
                summary: Some(summary.clone()),
                no_summary: false,
                concurrency: Some(2),
            },
            oracle.clone(),
        )
        .await
        .unwrap();

        // three decisions plus one pivot request
        assert_eq!(oracle.call_count(), 4);

        let results = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = results.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("1,Anna Nowak,") && lines[1].contains(",BUY,80,"));
        assert!(lines[2].starts_with("2,Jan Mazur,") && lines[2].contains(",NO_BUY,20,"));
        assert!(lines[3].starts_with("3,Ewa Wójcik,"));

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
        assert_eq!(value["oracle"], "scripted");
        assert_eq!(value["skipped_rows"], 1);
        assert_eq!(value["status"]["status"], "completed");
        assert_eq!(value["metrics"]["buy_count"], 2);
        assert_eq!(value["metrics"]["revenue"], 220.0);
        assert_eq!(value["advice"]["source"]["kind"], "oracle");
        assert!(value["advice"]["text"].as_str().unwrap().contains("Commuter Pass"));
    }

    #[tokio::test]
    async fn test_simulate_without_api_key_fails_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let population = dir.path().join("population.csv");
        std::fs::write(&population, "id,name,segment,income\n1,Jan,Gen Z Student,2500\n").unwrap();

        let mut config = TwinConfig::default();
        config.oracle.api_key = None;

        let err = simulate(
            &config,
            SimulateArgs {
                population,
                product: "Tram ticket".to_string(),
                price: 4.4,
                unit: None,
                output: None,
                summary: None,
                no_summary: true,
                concurrency: None,
            },
        )
        .await
        .unwrap_err();

        assert!(format!("{:#}", err).contains("not configured"));
    }
}
