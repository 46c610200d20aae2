//! Mutations a stage may request on its parent's shared state.
//!
//! Stages never touch the parent directly; they return one of these values
//! and the owner applies it between stages.

use serde::{Deserialize, Serialize};

use opt_types::{Bounds, Row};

/// Replacement bounds, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundsUpdate {
    pub bounds: Vec<(String, Bounds)>,
}

impl BoundsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, bounds: Bounds) -> Self {
        self.bounds.push((name.into(), bounds));
        self
    }

    pub fn get(&self, name: &str) -> Option<Bounds> {
        self.bounds
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| *b)
    }
}

/// Keep only rows whose `column` value is strictly below `cutoff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub cutoff: f64,
}

impl RowFilter {
    pub fn below(column: impl Into<String>, cutoff: f64) -> Self {
        Self {
            column: column.into(),
            cutoff,
        }
    }

    pub fn keeps(&self, row: &Row, column_index: usize) -> bool {
        row.values[column_index] < self.cutoff
    }
}
