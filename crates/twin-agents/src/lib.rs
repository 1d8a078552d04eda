//! # Twin-Agents
//!
//! Oracle-driven consumer decisions and simulation orchestration.
//!
//! ## Architecture
//!
//! ```text
//! Population + ProductQuery
//!     ↓
//! [SimulationOrchestrator]  bounded concurrency, cancellation, progress
//!     ↓ per agent
//! [EvaluateProduct] → Oracle (persona + offer, JSON answer)
//!     ↓
//! SimulationResult (rows in population order + metrics)
//!     ↓
//! [StrategySummarizer] → Oracle (rejection sample, plain text)
//!     → StrategyAdvice
//! ```
//!
//! Every oracle failure stays local: a failed evaluation becomes an `ERROR`
//! row, a failed summary becomes fallback advice.

pub mod consumer;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod openai;
pub mod oracle;
pub mod orchestrator;
pub mod prompts;
pub mod strategist;

pub use consumer::*;
#[cfg(any(test, feature = "testing"))]
pub use mock::*;
pub use openai::*;
pub use oracle::*;
pub use orchestrator::*;
pub use prompts::*;
pub use strategist::*;
