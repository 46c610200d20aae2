//! # opt-search
//!
//! Search strategies written against [`opt_engine::Objective`]: a
//! full-factorial [`GridSearch`] (sequential or batched across a worker
//! pool) and fixed-iteration [`GradientDescent`] with central
//! finite-difference gradients.

mod config;
mod gradient;
mod grid;

pub use config::SearchConfig;
pub use gradient::{GradientDescent, GradientDescentConfig};
pub use grid::{Execution, GridSearch, GridSearchConfig, Spacing};
