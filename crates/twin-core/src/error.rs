//! Error types for market twin simulations.

use thiserror::Error;

use crate::types::AgentId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Population source unavailable: {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[error("Malformed row at line {line}: {reason}")]
    RowMalformed { line: u64, reason: String },

    #[error("Population is empty")]
    EmptyPopulation,

    #[error("Duplicate agent id {0}")]
    DuplicateAgentId(AgentId),

    #[error("Trait {name} out of range [0, 1]: {value}")]
    InvalidTrait { name: &'static str, value: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No agent was evaluated, metrics are undefined")]
    NothingEvaluated,

    #[error("Simulation cancelled before any agent was evaluated")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Csv(e.to_string())
    }
}
