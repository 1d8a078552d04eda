//! Runtime configuration for the `twin` binary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use twin_agents::{EvaluationSettings, OracleConfig, OrchestratorConfig, SummarizerConfig};
use twin_core::DEFAULT_UNIT;
use twin_population::DEFAULT_DATASET_SIZES;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Complete CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwinConfig {
    /// Decision oracle connection
    pub oracle: OracleConfig,

    /// Simulation runs
    pub simulation: SimulationConfig,

    /// Strategy summary
    pub summary: SummaryConfig,

    /// Reference dataset generation
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum concurrent oracle calls
    pub max_concurrency: usize,

    /// Currency quoted in prompts
    pub currency: String,

    /// Unit used when a product has none
    pub default_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Whether to ask for strategy advice after a run
    pub enabled: bool,

    /// Maximum rejection reasons sent to the oracle
    pub sample_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub sizes: Vec<usize>,
    pub output_dir: PathBuf,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            currency: "PLN".to_string(),
            default_unit: DEFAULT_UNIT.to_string(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_cap: 20,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_DATASET_SIZES.to_vec(),
            output_dir: PathBuf::from("data"),
            seed: None,
        }
    }
}

impl TwinConfig {
    /// Load configuration from file, with `TWIN_` environment overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()?;

        settings
            .try_deserialize::<Self>()
            .map(Self::with_env_api_key)
            .and_then(Self::validated)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;

        settings
            .try_deserialize::<Self>()
            .map(Self::with_env_api_key)
            .and_then(Self::validated)
    }

    /// Reject values that would make every run degenerate
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let invalid = |msg: &str| Err(config::ConfigError::Message(msg.to_string()));

        if self.oracle.timeout_ms == 0 {
            return invalid("oracle.timeout_ms must be positive");
        }
        if self.simulation.max_concurrency == 0 {
            return invalid("simulation.max_concurrency must be positive");
        }
        if self.summary.sample_cap == 0 {
            return invalid("summary.sample_cap must be positive");
        }
        if self.generation.sizes.contains(&0) {
            return invalid("generation.sizes must all be positive");
        }
        Ok(())
    }

    fn validated(self) -> Result<Self, config::ConfigError> {
        self.validate().map(|_| self)
    }

    /// `TWIN_ORACLE__MODEL=gpt-4o` sets `oracle.model`
    fn environment() -> config::Environment {
        config::Environment::with_prefix("TWIN")
            .prefix_separator("_")
            .separator("__")
    }

    fn with_env_api_key(mut self) -> Self {
        if self.oracle.api_key.is_none() {
            self.oracle.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        self
    }

    pub fn evaluation(&self) -> EvaluationSettings {
        EvaluationSettings {
            currency: self.simulation.currency.clone(),
            timeout: self.oracle.timeout(),
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrency: self.simulation.max_concurrency,
            evaluation: self.evaluation(),
        }
    }

    pub fn summarizer(&self) -> SummarizerConfig {
        SummarizerConfig {
            sample_cap: self.summary.sample_cap,
            currency: self.simulation.currency.clone(),
            timeout: Duration::from_millis(self.oracle.timeout_ms),
        }
    }
}
