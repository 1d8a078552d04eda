//! # Twin-Population
//!
//! Builders for consumer populations.
//!
//! ## Sources
//!
//! 1. **Ingestion**: header-keyed CSV files, malformed rows skipped with diagnostics
//! 2. **Targeted synthesis**: a cohort generated from job, age range and locations
//! 3. **Reference generation**: segment-conditioned datasets of fixed sizes
//!
//! ```text
//! population_1000.csv ──► load_population ──► IngestReport ──► Population
//! TargetedCohort ───────► synthesize_cohort ────────────────► Population
//! DemographicTables ────► generate_reference_datasets ──────► population_{n}.csv
//! ```

pub mod generator;
pub mod ingest;
pub mod synthesis;
pub mod tables;

pub use generator::*;
pub use ingest::*;
pub use synthesis::*;
pub use tables::*;
