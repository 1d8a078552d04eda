//! # Twin-Core
//!
//! Core model for market twin simulations: synthetic consumers with
//! demographic and OCEAN personality attributes, the populations they form,
//! the products they evaluate and the aggregate metrics of a run.

pub mod agent;
pub mod decision;
pub mod error;
pub mod ocean;
pub mod segment;
pub mod simulation;
pub mod types;

pub use agent::*;
pub use decision::*;
pub use error::{Error, Result};
pub use ocean::*;
pub use segment::*;
pub use simulation::*;
pub use types::*;
