//! Full-factorial grid search.

use serde::{Deserialize, Serialize};
use tracing::info;

use opt_engine::{Objective, Search, SearchSpace};
use opt_types::{OptError, OptResult, UnitPoint};

/// How uniform axes are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    /// Evenly spaced in unit coordinates.
    #[default]
    Linear,
    /// Evenly spaced in the logarithm of the physical value. Needs strictly
    /// positive bounds.
    Log,
}

/// Whether grid points are measured one at a time or as a parallel batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    #[default]
    Sequential,
    Parallel { workers: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchConfig {
    /// Number of values per axis without override points.
    pub steps: usize,
    pub spacing: Spacing,
    pub execution: Execution,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            steps: 20,
            spacing: Spacing::Linear,
            execution: Execution::Sequential,
        }
    }
}

impl GridSearchConfig {
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_spacing(mut self, spacing: Spacing) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn parallel(mut self, workers: usize) -> Self {
        self.execution = Execution::Parallel { workers };
        self
    }
}

/// Exhaustive search over the Cartesian product of per-parameter axes.
///
/// Points are enumerated row-major: the last registered parameter varies
/// fastest.
#[derive(Debug, Clone, Default)]
pub struct GridSearch {
    config: GridSearchConfig,
}

impl GridSearch {
    pub fn new(config: GridSearchConfig) -> Self {
        Self { config }
    }

    pub fn with_steps(steps: usize) -> Self {
        Self::new(GridSearchConfig::default().with_steps(steps))
    }

    pub fn config(&self) -> &GridSearchConfig {
        &self.config
    }

    /// Every grid point in measurement order, in unit coordinates.
    pub fn build_grid(&self, space: &SearchSpace) -> OptResult<Vec<UnitPoint>> {
        let mut axes: Vec<Vec<f64>> = Vec::with_capacity(space.dim());

        for (axis, entry) in space.entries().iter().enumerate() {
            let values = match &entry.points {
                Some(points) => points
                    .iter()
                    .map(|&x| space.normalize_coordinate(axis, x))
                    .collect::<OptResult<Vec<f64>>>()?,
                None => self.uniform_axis(entry.name(), entry.bounds.min, entry.bounds.max)?,
            };
            axes.push(values);
        }

        // Cartesian product
        let mut result: Vec<Vec<f64>> = vec![Vec::with_capacity(axes.len())];
        for axis in &axes {
            let mut next = Vec::with_capacity(result.len() * axis.len());
            for existing in &result {
                for value in axis {
                    let mut combo = existing.clone();
                    combo.push(*value);
                    next.push(combo);
                }
            }
            result = next;
        }

        Ok(result.into_iter().map(UnitPoint::new).collect())
    }

    fn uniform_axis(&self, name: &str, min: f64, max: f64) -> OptResult<Vec<f64>> {
        let steps = self.config.steps;
        if steps == 0 {
            return Err(OptError::Config("grid search needs at least one step".to_string()));
        }
        let t = |i: usize| {
            if steps == 1 {
                0.0
            } else {
                i as f64 / (steps - 1) as f64
            }
        };

        match self.config.spacing {
            Spacing::Linear => Ok((0..steps).map(t).collect()),
            Spacing::Log => {
                if min <= 0.0 {
                    return Err(OptError::Config(format!(
                        "log spacing needs positive bounds for parameter {name}"
                    )));
                }
                if min == max {
                    return Ok(vec![0.0; steps]);
                }
                let log_low = min.ln();
                let log_high = max.ln();
                Ok((0..steps)
                    .map(|i| {
                        let x = (log_low + t(i) * (log_high - log_low)).exp();
                        ((x - min) / (max - min)).clamp(0.0, 1.0)
                    })
                    .collect())
            }
        }
    }
}

impl Search for GridSearch {
    fn name(&self) -> &str {
        "grid"
    }

    fn run(&mut self, objective: &mut dyn Objective) -> OptResult<()> {
        let grid = self.build_grid(objective.space())?;
        info!(
            "Grid search over {} points ({} parameters)",
            grid.len(),
            objective.space().dim()
        );

        match self.config.execution {
            Execution::Sequential => {
                for point in &grid {
                    objective.measure(point)?;
                }
            }
            Execution::Parallel { workers } => {
                objective.measure_batch(&grid, workers)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use opt_engine::{Algorithm, AlgorithmConfig};
    use opt_types::{Bounds, FnExperiment, Observation, ParameterSnapshot, SharedParameter};

    fn quadratic(bounds: Bounds) -> Algorithm {
        let experiment = FnExperiment::new("quadratic", |p: &ParameterSnapshot| {
            let x = p.get("x").unwrap_or_default();
            Ok(Observation::Scalar(x * x))
        });
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        algorithm
            .add_parameter(SharedParameter::new("x", 0.0).into_shared(), Some(bounds), None)
            .unwrap();
        algorithm
    }

    fn plane() -> Algorithm {
        let experiment = FnExperiment::new("plane", |p: &ParameterSnapshot| {
            let a = p.get("a").unwrap_or_default();
            let b = p.get("b").unwrap_or_default();
            Ok(Observation::Scalar(10.0 * a + b))
        });
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        algorithm
            .add_parameter(
                SharedParameter::new("a", 0.0).into_shared(),
                Some(Bounds::new(0.0, 2.0)),
                None,
            )
            .unwrap();
        algorithm
            .add_parameter(
                SharedParameter::new("b", 0.0).into_shared(),
                Some(Bounds::new(0.0, 1.0)),
                None,
            )
            .unwrap();
        algorithm
    }

    #[test]
    fn one_dimensional_grid_is_measured_in_order() {
        let mut algorithm = quadratic(Bounds::new(-1.0, 1.0));
        algorithm.run(&mut GridSearch::with_steps(5)).unwrap();

        let data = algorithm.dataset();
        assert_eq!(data.column("x").unwrap(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(data.len(), 5);
        assert_eq!(data.min("result"), Some(0.0));
    }

    #[test]
    fn last_parameter_varies_fastest() {
        let mut algorithm = plane();
        algorithm.run(&mut GridSearch::with_steps(3)).unwrap();

        let data = algorithm.dataset();
        assert_eq!(data.len(), 9);
        assert_eq!(
            data.column("a").unwrap(),
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]
        );
        assert_eq!(
            data.column("b").unwrap(),
            vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0, 0.5, 1.0]
        );
    }

    #[test]
    fn row_count_is_steps_to_the_dim() {
        let algorithm = plane();
        let grid = GridSearch::with_steps(4).build_grid(algorithm.space()).unwrap();
        assert_eq!(grid.len(), 16);
    }

    #[test]
    fn override_points_replace_uniform_axis() {
        let experiment = FnExperiment::new("sum", |p: &ParameterSnapshot| {
            Ok(Observation::Scalar(p.values().iter().sum()))
        });
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        algorithm
            .add_parameter(
                SharedParameter::new("gain", 0.0).into_shared(),
                None,
                Some(vec![2.0, 4.0, 6.0]),
            )
            .unwrap();
        algorithm
            .add_parameter(
                SharedParameter::new("offset", 0.0).into_shared(),
                Some(Bounds::new(0.0, 1.0)),
                None,
            )
            .unwrap();

        algorithm.run(&mut GridSearch::with_steps(2)).unwrap();
        let data = algorithm.dataset();
        assert_eq!(
            data.column("gain").unwrap(),
            vec![2.0, 2.0, 4.0, 4.0, 6.0, 6.0]
        );
        assert_eq!(
            data.column("offset").unwrap(),
            vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn log_spacing_is_geometric() {
        let algorithm = quadratic(Bounds::new(1.0, 100.0));
        let search = GridSearch::new(
            GridSearchConfig::default()
                .with_steps(3)
                .with_spacing(Spacing::Log),
        );
        let grid = search.build_grid(algorithm.space()).unwrap();
        let phys = algorithm.unnormalize_batch(&grid).unwrap();
        let values: Vec<f64> = phys.iter().map(|p| p[0]).collect();
        assert!((values[0] - 1.0).abs() < 1e-9);
        assert!((values[1] - 10.0).abs() < 1e-9);
        assert!((values[2] - 100.0).abs() < 1e-9);

        let negative = quadratic(Bounds::new(-1.0, 1.0));
        assert!(matches!(
            search.build_grid(negative.space()),
            Err(OptError::Config(_))
        ));
    }

    #[test]
    fn parallel_grid_matches_sequential_order() {
        let mut sequential = plane();
        sequential.run(&mut GridSearch::with_steps(4)).unwrap();

        let mut parallel = plane();
        let mut search = GridSearch::new(GridSearchConfig::default().with_steps(4).parallel(3));
        parallel.run(&mut search).unwrap();

        assert_eq!(
            sequential.dataset().column("a"),
            parallel.dataset().column("a")
        );
        assert_eq!(
            sequential.dataset().column("result"),
            parallel.dataset().column("result")
        );
    }

    #[test]
    fn parallel_batch_is_recorded_at_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut algorithm = plane().with_events(tx);
        let mut search = GridSearch::new(GridSearchConfig::default().with_steps(3).parallel(2));
        algorithm.run(&mut search).unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            opt_types::RunEvent::BatchRecorded { points: 9, .. }
        ));
    }

    #[test]
    fn zero_steps_is_a_config_error() {
        let algorithm = quadratic(Bounds::new(0.0, 1.0));
        assert!(GridSearch::with_steps(0)
            .build_grid(algorithm.space())
            .is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config: GridSearchConfig =
            serde_json::from_str(r#"{"steps": 7, "execution": {"parallel": {"workers": 2}}}"#)
                .unwrap();
        assert_eq!(config.steps, 7);
        assert_eq!(config.spacing, Spacing::Linear);
        assert_eq!(config.execution, Execution::Parallel { workers: 2 });
    }
}
