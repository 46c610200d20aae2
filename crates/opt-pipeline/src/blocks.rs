//! Pipeline stages.
//!
//! Prune and Zoom never touch the pipeline themselves. They inspect the
//! pipeline's dataset and return a [`RowFilter`] or [`BoundsUpdate`] that the
//! pipeline applies between stages.

use serde::{Deserialize, Serialize};

use opt_engine::{BoundsUpdate, RowFilter, Search, SearchSpace};
use opt_search::SearchConfig;
use opt_types::{Bounds, Dataset, OptError, OptResult};

use crate::model::Model;

fn check_threshold(block: &str, threshold: f64) -> OptResult<f64> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(threshold)
    } else {
        Err(OptError::Config(format!(
            "{block} threshold must lie in (0, 1], got {threshold}"
        )))
    }
}

/// `threshold * min(cost)` over the rows of `data`.
fn cutoff(data: &Dataset, result_column: &str, threshold: f64) -> OptResult<f64> {
    if data.is_empty() {
        return Err(OptError::EmptyDataset);
    }
    if data.column_index(result_column).is_none() {
        return Err(OptError::MissingResultColumn {
            column: result_column.to_string(),
        });
    }
    let min = data.min(result_column).ok_or(OptError::EmptyDataset)?;
    Ok(threshold * min)
}

/// Drops rows whose cost is not below `threshold * min(cost)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prune {
    threshold: f64,
}

impl Prune {
    pub fn new(threshold: f64) -> OptResult<Self> {
        Ok(Self {
            threshold: check_threshold("prune", threshold)?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn plan(&self, data: &Dataset, result_column: &str) -> OptResult<RowFilter> {
        let cutoff = cutoff(data, result_column, self.threshold)?;
        Ok(RowFilter::below(result_column, cutoff))
    }
}

impl Default for Prune {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Narrows every parameter's bounds to the range spanned by the rows whose
/// cost is below `threshold * min(cost)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zoom {
    threshold: f64,
}

impl Zoom {
    pub fn new(threshold: f64) -> OptResult<Self> {
        Ok(Self {
            threshold: check_threshold("zoom", threshold)?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// New bounds for every registered parameter. The result never extends
    /// past the current bounds.
    pub fn plan(
        &self,
        data: &Dataset,
        space: &SearchSpace,
        result_column: &str,
    ) -> OptResult<BoundsUpdate> {
        let cutoff = cutoff(data, result_column, self.threshold)?;
        let filter = RowFilter::below(result_column, cutoff);
        let cost_idx = data
            .column_index(result_column)
            .ok_or_else(|| OptError::MissingResultColumn {
                column: result_column.to_string(),
            })?;
        let good: Vec<_> = data
            .rows()
            .iter()
            .filter(|row| filter.keeps(row, cost_idx))
            .collect();
        if good.is_empty() {
            return Err(OptError::EmptyZoom {
                threshold: self.threshold,
            });
        }

        let mut update = BoundsUpdate::new();
        for entry in space.entries() {
            let name = entry.name();
            let idx = data
                .column_index(name)
                .ok_or_else(|| OptError::UnknownParameter {
                    name: name.to_string(),
                })?;
            let values: Vec<f64> = good.iter().map(|row| row.values[idx]).collect();
            let spanned = Bounds::from_points(&values).ok_or(OptError::EmptyZoom {
                threshold: self.threshold,
            })?;
            update = update.set(name, spanned.restrict_to(&entry.bounds));
        }
        Ok(update)
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// How many times a [`Loop`] repeats its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    Count(usize),
    /// Until a stage fails. There is no other way out.
    Continuous,
}

/// Repeats a nested block sequence against the enclosing pipeline's state.
#[derive(Debug)]
pub struct Loop {
    pub(crate) repeat: Repeat,
    pub(crate) blocks: Vec<Block>,
}

impl Loop {
    pub fn times(count: usize) -> Self {
        Self {
            repeat: Repeat::Count(count),
            blocks: Vec::new(),
        }
    }

    pub fn continuous() -> Self {
        Self {
            repeat: Repeat::Continuous,
            blocks: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: impl Into<Block>) -> Self {
        self.blocks.push(block.into());
        self
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

/// One stage of a [`Pipeline`](crate::Pipeline).
pub enum Block {
    /// Runs a search against a fork of the pipeline and merges its rows.
    Search(Box<dyn Search>),
    /// Fit, optimize on the surrogate, then one physical measurement.
    Model(Model),
    Prune(Prune),
    Zoom(Zoom),
    Loop(Loop),
}

impl Block {
    pub fn search(search: impl Search + 'static) -> Self {
        Self::Search(Box::new(search))
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::Search(config.build())
    }

    pub fn name(&self) -> String {
        match self {
            Self::Search(search) => search.name().to_string(),
            Self::Model(model) => format!("model:{}", model.surrogate().name()),
            Self::Prune(_) => "prune".to_string(),
            Self::Zoom(_) => "zoom".to_string(),
            Self::Loop(_) => "loop".to_string(),
        }
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Search(search) => f.debug_tuple("Search").field(&search.name()).finish(),
            Self::Model(model) => f.debug_tuple("Model").field(model).finish(),
            Self::Prune(prune) => f.debug_tuple("Prune").field(prune).finish(),
            Self::Zoom(zoom) => f.debug_tuple("Zoom").field(zoom).finish(),
            Self::Loop(l) => f.debug_tuple("Loop").field(l).finish(),
        }
    }
}

impl From<Box<dyn Search>> for Block {
    fn from(search: Box<dyn Search>) -> Self {
        Self::Search(search)
    }
}

impl From<opt_search::GridSearch> for Block {
    fn from(search: opt_search::GridSearch) -> Self {
        Self::search(search)
    }
}

impl From<opt_search::GradientDescent> for Block {
    fn from(search: opt_search::GradientDescent) -> Self {
        Self::search(search)
    }
}

impl From<SearchConfig> for Block {
    fn from(config: SearchConfig) -> Self {
        Self::from_config(&config)
    }
}

impl From<Model> for Block {
    fn from(model: Model) -> Self {
        Self::Model(model)
    }
}

impl From<Prune> for Block {
    fn from(prune: Prune) -> Self {
        Self::Prune(prune)
    }
}

impl From<Zoom> for Block {
    fn from(zoom: Zoom) -> Self {
        Self::Zoom(zoom)
    }
}

impl From<Loop> for Block {
    fn from(l: Loop) -> Self {
        Self::Loop(l)
    }
}
