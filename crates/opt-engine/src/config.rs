//! Algorithm-level configuration.

use serde::{Deserialize, Serialize};

/// Default inclusive slack applied to bounds checks.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Default name of the primary result column.
pub const DEFAULT_RESULT_COLUMN: &str = "result";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    /// Bounds-check slack ε: a coordinate passes if it lies in
    /// `[min - ε, max + ε]`.
    pub tolerance: f64,

    /// Column the primary result is recorded under.
    pub result_column: String,

    /// Worker count for batched evaluation.
    pub workers: usize,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            result_column: DEFAULT_RESULT_COLUMN.to_string(),
            workers: default_workers(),
        }
    }
}

impl AlgorithmConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_result_column(mut self, column: impl Into<String>) -> Self {
        self.result_column = column.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
