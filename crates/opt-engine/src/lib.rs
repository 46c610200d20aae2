//! # opt-engine
//!
//! Algorithm core for Optimist.
//!
//! Provides the parameter registry and normalization engine, the
//! actuate/measure contract with fail-fast bounds enforcement, the
//! [`Objective`]/[`Search`] seams search strategies are written against, a
//! bounded worker pool for batched evaluation, and a threaded run mode.

mod algorithm;
mod background;
mod commands;
mod config;
mod executor;
mod objective;
mod space;

pub use algorithm::Algorithm;
pub use background::{BackgroundRun, Finished};
pub use commands::{BoundsUpdate, RowFilter};
pub use config::{default_workers, AlgorithmConfig, DEFAULT_RESULT_COLUMN, DEFAULT_TOLERANCE};
pub use executor::ParallelExecutor;
pub use objective::{Objective, Search};
pub use space::{ParameterEntry, SearchSpace};
