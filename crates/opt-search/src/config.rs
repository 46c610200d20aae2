//! Serializable choice of search strategy.

use serde::{Deserialize, Serialize};

use opt_engine::Search;

use crate::gradient::{GradientDescent, GradientDescentConfig};
use crate::grid::{GridSearch, GridSearchConfig};

/// Which search a pipeline stage runs, with its settings.
///
/// Externally tagged, so JSON reads `{"grid": {"steps": 10}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchConfig {
    Grid(GridSearchConfig),
    GradientDescent(GradientDescentConfig),
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::Grid(GridSearchConfig::default())
    }
}

impl SearchConfig {
    pub fn build(&self) -> Box<dyn Search> {
        match self {
            Self::Grid(config) => Box::new(GridSearch::new(config.clone())),
            Self::GradientDescent(config) => Box::new(GradientDescent::new(config.clone())),
        }
    }
}
