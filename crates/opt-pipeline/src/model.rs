//! Surrogate-model stage.
//!
//! A [`Model`] is fitted on the pipeline's normalized dataset, then its inner
//! searches run against a [`SurrogateObjective`] that answers every
//! measurement with a prediction. The lowest predicted point is handed back
//! to the pipeline, which makes the one real measurement there.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use opt_engine::{Objective, Search, SearchSpace};
use opt_types::{Dataset, OptError, OptResult, Record, UnitPoint};

/// Column holding the predicted standard deviation in a model's dataset.
pub const UNCERTAINTY_COLUMN: &str = "uncertainty";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub estimate: f64,
    pub uncertainty: f64,
}

/// A cheap approximation of the cost surface over unit coordinates.
pub trait Surrogate: Send {
    fn name(&self) -> &str;

    /// Train on `inputs` (one unit-coordinate vector per row) and `costs`.
    fn fit(&mut self, inputs: &[Vec<f64>], costs: &[f64]) -> OptResult<()>;

    fn predict(&self, point: &UnitPoint) -> OptResult<Prediction>;
}

type FitFn<S> = Box<dyn FnMut(&[Vec<f64>], &[f64]) -> OptResult<S> + Send>;
type PredictFn<S> = Box<dyn Fn(&S, &UnitPoint) -> OptResult<Prediction> + Send>;

/// Surrogate backed by a pair of closures, for plugging in an external
/// regression routine. `fit` produces the fitted state that `predict` reads.
pub struct FnSurrogate<S> {
    name: String,
    state: Option<S>,
    fit: FitFn<S>,
    predict: PredictFn<S>,
}

impl<S: Send> FnSurrogate<S> {
    pub fn new<F, P>(name: impl Into<String>, fit: F, predict: P) -> Self
    where
        F: FnMut(&[Vec<f64>], &[f64]) -> OptResult<S> + Send + 'static,
        P: Fn(&S, &UnitPoint) -> OptResult<Prediction> + Send + 'static,
    {
        Self {
            name: name.into(),
            state: None,
            fit: Box::new(fit),
            predict: Box::new(predict),
        }
    }

    pub fn state(&self) -> Option<&S> {
        self.state.as_ref()
    }
}

impl<S: Send> Surrogate for FnSurrogate<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, inputs: &[Vec<f64>], costs: &[f64]) -> OptResult<()> {
        self.state = Some((self.fit)(inputs, costs)?);
        Ok(())
    }

    fn predict(&self, point: &UnitPoint) -> OptResult<Prediction> {
        let state = self.state.as_ref().ok_or(OptError::SurrogateNotFitted)?;
        (self.predict)(state, point)
    }
}

/// Predict-backed objective. Measurements are bounds-checked like physical
/// ones and recorded into a private dataset, in unit coordinates.
pub struct SurrogateObjective<'a> {
    space: &'a SearchSpace,
    surrogate: &'a dyn Surrogate,
    data: &'a mut Dataset,
    result_column: &'a str,
    tolerance: f64,
}

impl<'a> SurrogateObjective<'a> {
    pub fn new(
        space: &'a SearchSpace,
        surrogate: &'a dyn Surrogate,
        data: &'a mut Dataset,
        result_column: &'a str,
        tolerance: f64,
    ) -> Self {
        Self {
            space,
            surrogate,
            data,
            result_column,
            tolerance,
        }
    }
}

impl Objective for SurrogateObjective<'_> {
    fn space(&self) -> &SearchSpace {
        self.space
    }

    fn measure(&mut self, point: &UnitPoint) -> OptResult<f64> {
        let physical = self.space.unnormalize(point)?;
        self.space.check(&physical, self.tolerance)?;
        let prediction = self.surrogate.predict(point)?;

        let mut record = Record::new();
        for (entry, x) in self.space.entries().iter().zip(point.iter()) {
            record = record.with(entry.name(), *x);
        }
        record = record
            .with(self.result_column, prediction.estimate)
            .with(UNCERTAINTY_COLUMN, prediction.uncertainty);
        self.data.push_observation(&[record])?;
        Ok(prediction.estimate)
    }
}

/// Fit → optimize → suggest stage.
pub struct Model {
    surrogate: Box<dyn Surrogate>,
    searches: Vec<Box<dyn Search>>,
    data: Dataset,
}

impl Model {
    pub fn new(surrogate: impl Surrogate + 'static) -> Self {
        Self {
            surrogate: Box::new(surrogate),
            searches: Vec::new(),
            data: Dataset::new(),
        }
    }

    /// Add an inner search run against the surrogate by [`optimize`](Self::optimize).
    pub fn with_search(mut self, search: impl Search + 'static) -> Self {
        self.searches.push(Box::new(search));
        self
    }

    pub fn with_boxed_search(mut self, search: Box<dyn Search>) -> Self {
        self.searches.push(search);
        self
    }

    pub fn surrogate(&self) -> &dyn Surrogate {
        self.surrogate.as_ref()
    }

    /// Surrogate evaluations made by the last `optimize` call.
    pub fn data(&self) -> &Dataset {
        &self.data
    }

    /// Fit on a dataset whose parameter columns are in unit coordinates.
    pub fn fit(&mut self, data: &Dataset, parameters: &[String], result_column: &str) -> OptResult<()> {
        if data.is_empty() {
            return Err(OptError::EmptyDataset);
        }
        let param_idx = parameters
            .iter()
            .map(|p| {
                data.column_index(p)
                    .ok_or_else(|| OptError::UnknownParameter { name: p.clone() })
            })
            .collect::<OptResult<Vec<usize>>>()?;
        let cost_idx = data
            .column_index(result_column)
            .ok_or_else(|| OptError::MissingResultColumn {
                column: result_column.to_string(),
            })?;

        let inputs: Vec<Vec<f64>> = data
            .rows()
            .iter()
            .map(|row| param_idx.iter().map(|&i| row.values[i]).collect())
            .collect();
        let costs: Vec<f64> = data.rows().iter().map(|row| row.values[cost_idx]).collect();

        info!(
            "Fitting surrogate {} on {} rows",
            self.surrogate.name(),
            inputs.len()
        );
        self.surrogate.fit(&inputs, &costs)
    }

    pub fn predict(&self, point: &UnitPoint) -> OptResult<Prediction> {
        self.surrogate.predict(point)
    }

    /// Run every inner search against the surrogate and return the lowest
    /// predicted point. The model's dataset is cleared first.
    pub fn optimize(
        &mut self,
        space: &SearchSpace,
        tolerance: f64,
        result_column: &str,
    ) -> OptResult<UnitPoint> {
        if self.searches.is_empty() {
            return Err(OptError::Config(format!(
                "model {} has no search to optimize with",
                self.surrogate.name()
            )));
        }

        let Model {
            surrogate,
            searches,
            data,
        } = self;
        *data = Dataset::new();

        let mut objective =
            SurrogateObjective::new(space, surrogate.as_ref(), data, result_column, tolerance);
        for search in searches.iter_mut() {
            debug!("Optimizing surrogate with {}", search.name());
            search.run(&mut objective)?;
        }

        let best = self.data.best(result_column).ok_or(OptError::EmptyDataset)?;
        let coords = space
            .names()
            .iter()
            .map(|n| {
                self.data
                    .column_index(n)
                    .map(|i| best.values[i])
                    .ok_or_else(|| OptError::UnknownParameter { name: n.clone() })
            })
            .collect::<OptResult<Vec<f64>>>()?;
        let suggestion = UnitPoint::new(coords);
        info!(
            "Surrogate suggests {:?} over {} evaluations",
            suggestion.as_slice(),
            self.data.len()
        );
        Ok(suggestion)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("surrogate", &self.surrogate.name())
            .field(
                "searches",
                &self.searches.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("rows", &self.data.len())
            .finish()
    }
}
