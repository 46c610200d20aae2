//! The experiment capability.
//!
//! An experiment is sampled against an explicit [`ParameterSnapshot`]; it
//! never reaches into caller state to discover parameter values.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bounds::Bounds;
use crate::errors::{OptError, OptResult};
use crate::parameter::{Parameter, ParameterSnapshot, SharedParameter};

/// One structured result row: ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, f64)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: f64) -> Self {
        self.fields.push((column.into(), value));
        self
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| *v)
    }

    pub fn fields(&self) -> &[(String, f64)] {
        &self.fields
    }
}

/// What a single experiment call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    /// A single cost value.
    Scalar(f64),
    /// One or more multi-column rows, each carrying the result column.
    Table(Vec<Record>),
}

/// Discriminant of an [`Observation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationKind {
    Scalar,
    Table,
}

impl Observation {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Self::Scalar(_) => ObservationKind::Scalar,
            Self::Table(_) => ObservationKind::Table,
        }
    }
}

impl From<f64> for Observation {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for Observation {
    fn from(value: i64) -> Self {
        Self::Scalar(value as f64)
    }
}

impl From<Vec<Record>> for Observation {
    fn from(records: Vec<Record>) -> Self {
        Self::Table(records)
    }
}

/// The measurement capability driven by the optimizer.
///
/// `sample` should be deterministic for a fixed snapshot. It must be safe
/// to call from several worker threads at once when parallel evaluation is
/// used.
pub trait Experiment: Send + Sync {
    fn name(&self) -> &str;

    fn sample(&self, parameters: &ParameterSnapshot) -> OptResult<Observation>;

    /// Resolve a parameter registered with this experiment by name.
    fn parameter(&self, _name: &str) -> Option<Arc<dyn Parameter>> {
        None
    }

    /// Experiment-level bounds for a registered parameter.
    fn bounds(&self, _name: &str) -> Option<Bounds> {
        None
    }
}

type SampleFn = dyn Fn(&ParameterSnapshot) -> OptResult<Observation> + Send + Sync;

/// Closure-backed experiment owning its own parameter registry.
pub struct FnExperiment {
    name: String,
    parameters: Vec<Arc<dyn Parameter>>,
    bounds: HashMap<String, Bounds>,
    sample: Box<SampleFn>,
}

impl FnExperiment {
    pub fn new<F>(name: impl Into<String>, sample: F) -> Self
    where
        F: Fn(&ParameterSnapshot) -> OptResult<Observation> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            bounds: HashMap::new(),
            sample: Box::new(sample),
        }
    }

    /// Register an existing parameter.
    ///
    /// Without explicit `bounds` the parameter's intrinsic bounds are used.
    /// Explicit bounds may narrow, but never exceed, the intrinsic ones.
    pub fn add_parameter(
        &mut self,
        parameter: Arc<dyn Parameter>,
        bounds: Option<Bounds>,
    ) -> OptResult<()> {
        let name = parameter.name().to_string();
        if self.bounds.contains_key(&name) {
            return Err(OptError::DuplicateParameter { name });
        }

        let resolved = match (bounds, parameter.bounds()) {
            (Some(explicit), Some(intrinsic)) => {
                explicit.validate(&name)?;
                if !explicit.is_subset_of(&intrinsic) {
                    return Err(OptError::InvalidBounds {
                        parameter: name,
                        min: explicit.min,
                        max: explicit.max,
                    });
                }
                explicit
            }
            (Some(explicit), None) => {
                explicit.validate(&name)?;
                explicit
            }
            (None, Some(intrinsic)) => {
                intrinsic.validate(&name)?;
                intrinsic
            }
            (None, None) => return Err(OptError::MissingBounds { parameter: name }),
        };

        debug!("Experiment {} registered {} with bounds {}", self.name, name, resolved);
        self.bounds.insert(name, resolved);
        self.parameters.push(parameter);
        Ok(())
    }

    /// Create, register and return a fresh in-memory parameter.
    pub fn add_new_parameter(
        &mut self,
        name: impl Into<String>,
        value: f64,
        bounds: Bounds,
    ) -> OptResult<SharedParameter> {
        let parameter = SharedParameter::new(name, value);
        self.add_parameter(Arc::new(parameter.clone()), Some(bounds))?;
        Ok(parameter)
    }

    pub fn parameters(&self) -> &[Arc<dyn Parameter>] {
        &self.parameters
    }

    pub fn into_shared(self) -> Arc<dyn Experiment> {
        Arc::new(self)
    }
}

impl std::fmt::Debug for FnExperiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExperiment")
            .field("name", &self.name)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl Experiment for FnExperiment {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample(&self, parameters: &ParameterSnapshot) -> OptResult<Observation> {
        (self.sample)(parameters)
    }

    fn parameter(&self, name: &str) -> Option<Arc<dyn Parameter>> {
        self.parameters.iter().find(|p| p.name() == name).cloned()
    }

    fn bounds(&self, name: &str) -> Option<Bounds> {
        self.bounds.get(name).copied()
    }
}
