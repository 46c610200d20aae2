//! Algorithm core: parameter registry, bounds, dataset and the
//! actuate → sample → record contract.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use opt_types::{
    Bounds, Dataset, Experiment, Observation, OptError, OptResult, Parameter, ParameterSnapshot,
    PhysicalPoint, Record, Row, RunEvent, RunId, UnitPoint,
};

use crate::background::BackgroundRun;
use crate::commands::{BoundsUpdate, RowFilter};
use crate::config::AlgorithmConfig;
use crate::executor::ParallelExecutor;
use crate::objective::{Objective, Search};
use crate::space::SearchSpace;

/// Owns the configuration and history of one optimization run.
///
/// Points handed to [`actuate`](Self::actuate) and [`measure`](Self::measure)
/// are in unit coordinates; the dataset records physical values.
pub struct Algorithm {
    id: RunId,
    experiment: Arc<dyn Experiment>,
    space: SearchSpace,
    dependents: Vec<Arc<dyn Parameter>>,
    dataset: Dataset,
    config: AlgorithmConfig,
    events: Option<Sender<RunEvent>>,
}

impl Algorithm {
    pub fn new(experiment: Arc<dyn Experiment>, config: AlgorithmConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            experiment,
            space: SearchSpace::new(),
            dependents: Vec::new(),
            dataset: Dataset::new(),
            config,
            events: None,
        }
    }

    /// Stream [`RunEvent`]s to `sender`. Sends are best-effort.
    pub fn with_events(mut self, sender: Sender<RunEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    pub fn experiment(&self) -> &Arc<dyn Experiment> {
        &self.experiment
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    pub fn result_column(&self) -> &str {
        &self.config.result_column
    }

    pub fn dim(&self) -> usize {
        self.space.dim()
    }

    /// Register `parameter`.
    ///
    /// Bounds resolve in order: explicit `bounds`, the range of the override
    /// `points`, the experiment's bounds for that name, the parameter's
    /// intrinsic bounds. With none available this fails with `MissingBounds`.
    pub fn add_parameter(
        &mut self,
        parameter: Arc<dyn Parameter>,
        bounds: Option<Bounds>,
        points: Option<Vec<f64>>,
    ) -> OptResult<()> {
        let name = parameter.name().to_string();
        let resolved = bounds
            .or_else(|| points.as_deref().and_then(Bounds::from_points))
            .or_else(|| self.experiment.bounds(&name))
            .or_else(|| parameter.bounds())
            .ok_or_else(|| OptError::MissingBounds {
                parameter: name.clone(),
            })?;

        if resolved.is_degenerate() {
            warn!("Parameter {} registered with zero-width bounds {}", name, resolved);
        }
        debug!("Registered parameter {} with bounds {}", name, resolved);
        self.space.register(parameter, resolved, points)
    }

    /// Register a parameter the experiment knows by `name`.
    pub fn add_parameter_named(
        &mut self,
        name: &str,
        bounds: Option<Bounds>,
        points: Option<Vec<f64>>,
    ) -> OptResult<()> {
        let parameter = self
            .experiment
            .parameter(name)
            .ok_or_else(|| OptError::UnknownParameter {
                name: name.to_string(),
            })?;
        self.add_parameter(parameter, bounds, points)
    }

    /// Wait `delay` after writing `name`, before the next parameter is written.
    pub fn set_delay(&mut self, name: &str, delay: Duration) -> OptResult<()> {
        self.space.set_delay(name, delay)
    }

    /// Record `parameter` as an extra column after every measurement.
    pub fn add_dependent(&mut self, parameter: Arc<dyn Parameter>) {
        self.dependents.push(parameter);
    }

    pub fn normalize(&self, point: &PhysicalPoint) -> OptResult<UnitPoint> {
        self.space.normalize(point)
    }

    pub fn unnormalize(&self, point: &UnitPoint) -> OptResult<PhysicalPoint> {
        self.space.unnormalize(point)
    }

    pub fn normalize_batch(&self, points: &[PhysicalPoint]) -> OptResult<Vec<UnitPoint>> {
        self.space.normalize_batch(points)
    }

    pub fn unnormalize_batch(&self, points: &[UnitPoint]) -> OptResult<Vec<PhysicalPoint>> {
        self.space.unnormalize_batch(points)
    }

    /// Move every parameter to `point`.
    ///
    /// All coordinates are bounds-checked before the first write, so an
    /// out-of-bounds request never moves anything.
    pub fn actuate(&self, point: &UnitPoint) -> OptResult<PhysicalPoint> {
        let physical = self.space.unnormalize(point)?;
        self.space.check(&physical, self.config.tolerance)?;

        for (entry, &value) in self.space.entries().iter().zip(physical.iter()) {
            entry.parameter.set(value)?;
            if let Some(delay) = entry.delay {
                std::thread::sleep(delay);
            }
        }
        Ok(physical)
    }

    /// Sample the experiment at the current live parameter values.
    pub fn sample(&self) -> OptResult<Observation> {
        self.experiment.sample(&self.space.live_snapshot())
    }

    /// Actuate to `point`, sample, and append the observation.
    ///
    /// Returns the primary result of the last appended row.
    pub fn measure(&mut self, point: &UnitPoint) -> OptResult<f64> {
        self.actuate(point)?;
        let snapshot = self.space.live_snapshot();
        let observation = self.experiment.sample(&snapshot)?;
        let dependents: Vec<(String, f64)> = self
            .dependents
            .iter()
            .map(|d| (d.name().to_string(), d.get()))
            .collect();

        let records = self.build_records(observation, &snapshot, &dependents)?;
        let observation = self.dataset.push_observation(&records)?;
        let result = self.last_result()?;

        debug!(
            "Measured {:?} -> {} ({} rows)",
            snapshot.values(),
            result,
            self.dataset.len()
        );
        self.emit(RunEvent::MeasurementRecorded {
            run_id: self.id,
            observation,
            parameters: snapshot.values(),
            result,
        });
        Ok(result)
    }

    /// Evaluate independent points on a worker pool.
    ///
    /// Live parameters are never written: each task samples the experiment
    /// against its own snapshot. Rows are appended as one batch, in input
    /// order, after every task has finished. `workers == 0` uses the
    /// configured worker count.
    pub fn measure_batch(&mut self, points: &[UnitPoint], workers: usize) -> OptResult<Vec<f64>> {
        if !self.dependents.is_empty() {
            return Err(OptError::Config(
                "dependent variables cannot be sampled during parallel evaluation".to_string(),
            ));
        }

        let physical = self.space.unnormalize_batch(points)?;
        for p in &physical {
            self.space.check(p, self.config.tolerance)?;
        }
        let snapshots = physical
            .iter()
            .map(|p| self.space.snapshot_of(p))
            .collect::<OptResult<Vec<_>>>()?;

        let workers = if workers == 0 {
            self.config.workers
        } else {
            workers
        };
        let executor = ParallelExecutor::new(workers)?;
        info!(
            "Evaluating batch of {} points on {} workers",
            snapshots.len(),
            executor.workers()
        );
        let experiment = Arc::clone(&self.experiment);
        let observations = executor.try_map(&snapshots, |s| experiment.sample(s))?;

        let mut staged = self.dataset.clone();
        let mut results = Vec::with_capacity(observations.len());
        for (observation, snapshot) in observations.into_iter().zip(&snapshots) {
            let records = self.build_records(observation, snapshot, &[])?;
            staged.push_observation(&records)?;
            results.push(primary_result(&staged, &self.config.result_column)?);
        }
        self.dataset = staged;

        self.emit(RunEvent::BatchRecorded {
            run_id: self.id,
            points: results.len(),
            workers: executor.workers(),
        });
        Ok(results)
    }

    /// Current live position in unit coordinates.
    pub fn current_point(&self) -> OptResult<UnitPoint> {
        self.space.normalize(&self.space.live_point())
    }

    /// Dataset with parameter columns mapped into unit coordinates under the
    /// current bounds.
    pub fn data_normalized(&self) -> OptResult<Dataset> {
        self.space.normalize_dataset(&self.dataset)
    }

    /// Row with the lowest primary result.
    pub fn best(&self) -> Option<&Row> {
        self.dataset.best(&self.config.result_column)
    }

    /// Physical coordinates of the best row.
    pub fn best_point(&self) -> Option<PhysicalPoint> {
        let row = self.best()?;
        let coords = self
            .space
            .names()
            .iter()
            .map(|n| self.dataset.column_index(n).map(|i| row.values[i]))
            .collect::<Option<Vec<f64>>>()?;
        Some(PhysicalPoint::new(coords))
    }

    /// Replace bounds as requested by a zoom stage.
    pub fn apply_bounds(&mut self, update: &BoundsUpdate) -> OptResult<()> {
        for (name, _) in &update.bounds {
            self.space.entry(name)?;
        }
        for (name, bounds) in &update.bounds {
            let previous = self.space.set_bounds(name, *bounds)?;
            info!("Bounds for {} updated {} -> {}", name, previous, bounds);
            self.emit(RunEvent::BoundsUpdated {
                run_id: self.id,
                parameter: name.clone(),
                previous,
                current: *bounds,
            });
        }
        Ok(())
    }

    /// Drop rows as requested by a prune stage. Returns the number removed.
    pub fn apply_filter(&mut self, filter: &RowFilter) -> OptResult<usize> {
        let idx = self
            .dataset
            .column_index(&filter.column)
            .ok_or_else(|| OptError::MissingResultColumn {
                column: filter.column.clone(),
            })?;
        let removed = self.dataset.retain(|row| filter.keeps(row, idx));
        info!(
            "Pruned {} rows below cutoff {}, {} retained",
            removed,
            filter.cutoff,
            self.dataset.len()
        );
        self.emit(RunEvent::RowsPruned {
            run_id: self.id,
            removed,
            retained: self.dataset.len(),
        });
        Ok(removed)
    }

    /// Append rows recorded by a child run after the existing rows.
    pub fn merge(&mut self, rows: Dataset) -> OptResult<()> {
        self.dataset.extend(rows)
    }

    /// A new run sharing this run's experiment, parameter handles, bounds,
    /// delays, dependents and event stream, with an empty dataset.
    pub fn fork(&self) -> Algorithm {
        Algorithm {
            id: Uuid::new_v4(),
            experiment: Arc::clone(&self.experiment),
            space: self.space.clone(),
            dependents: self.dependents.clone(),
            dataset: Dataset::new(),
            config: self.config.clone(),
            events: self.events.clone(),
        }
    }

    /// Run `search` against this algorithm.
    pub fn run<S: Search + ?Sized>(&mut self, search: &mut S) -> OptResult<()> {
        info!("Running {} on run {}", search.name(), self.id);
        search.run(self)
    }

    /// Run `search` on a background thread. The algorithm comes back from
    /// [`BackgroundRun::join`].
    pub fn spawn<S>(self, mut search: S) -> OptResult<BackgroundRun<Algorithm>>
    where
        S: Search + 'static,
    {
        let name = format!("opt-run-{}", self.id);
        BackgroundRun::spawn(name, self, move |algorithm| algorithm.run(&mut search))
    }

    /// Send `event` to the attached stream, if any.
    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            // Best-effort; a dropped receiver must not stop the run.
            let _ = tx.try_send(event);
        }
    }

    fn last_result(&self) -> OptResult<f64> {
        primary_result(&self.dataset, &self.config.result_column)
    }

    fn build_records(
        &self,
        observation: Observation,
        snapshot: &ParameterSnapshot,
        dependents: &[(String, f64)],
    ) -> OptResult<Vec<Record>> {
        let result_column = &self.config.result_column;
        match observation {
            Observation::Scalar(value) => {
                let mut record = Record::new();
                for (name, v) in snapshot.iter() {
                    record = record.with(name, v);
                }
                record = record.with(result_column.as_str(), value);
                for (name, v) in dependents {
                    record = record.with(name.as_str(), *v);
                }
                Ok(vec![record])
            }
            Observation::Table(rows) => {
                if rows.is_empty() {
                    return Err(OptError::Validation(format!(
                        "experiment {} returned an empty table",
                        self.experiment.name()
                    )));
                }
                rows.iter()
                    .map(|row| {
                        if row.get(result_column).is_none() {
                            return Err(OptError::MissingResultColumn {
                                column: result_column.clone(),
                            });
                        }
                        let mut record = Record::new();
                        for (name, v) in snapshot.iter() {
                            record = record.with(name, row.get(name).unwrap_or(v));
                        }
                        for (name, v) in row.fields() {
                            if snapshot.get(name).is_none() {
                                record = record.with(name.as_str(), *v);
                            }
                        }
                        for (name, v) in dependents {
                            record = record.with(name.as_str(), *v);
                        }
                        Ok(record)
                    })
                    .collect()
            }
        }
    }
}

fn primary_result(dataset: &Dataset, column: &str) -> OptResult<f64> {
    let idx = dataset
        .column_index(column)
        .ok_or_else(|| OptError::MissingResultColumn {
            column: column.to_string(),
        })?;
    dataset
        .last()
        .map(|row| row.values[idx])
        .ok_or(OptError::EmptyDataset)
}

impl Objective for Algorithm {
    fn space(&self) -> &SearchSpace {
        &self.space
    }

    fn measure(&mut self, point: &UnitPoint) -> OptResult<f64> {
        Algorithm::measure(self, point)
    }

    fn measure_batch(&mut self, points: &[UnitPoint], workers: usize) -> OptResult<Vec<f64>> {
        Algorithm::measure_batch(self, points, workers)
    }

    fn current_point(&self) -> OptResult<UnitPoint> {
        Algorithm::current_point(self)
    }
}

impl std::fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Algorithm")
            .field("id", &self.id)
            .field("experiment", &self.experiment.name())
            .field("space", &self.space)
            .field("rows", &self.dataset.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use opt_types::{FnExperiment, SharedParameter};
    use std::time::Instant;

    fn quadratic() -> (Algorithm, SharedParameter) {
        let x = SharedParameter::new("x", 0.0);
        let experiment = FnExperiment::new("quadratic", |p: &ParameterSnapshot| {
            let x = p.get("x").unwrap_or_default();
            Ok(Observation::Scalar(x * x))
        });
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        algorithm
            .add_parameter(Arc::new(x.clone()), Some(Bounds::new(-1.0, 1.0)), None)
            .unwrap();
        (algorithm, x)
    }

    fn two_parameter() -> (Algorithm, SharedParameter, SharedParameter) {
        let voltage = SharedParameter::new("voltage", 0.0);
        let current = SharedParameter::new("current", 0.0);
        let experiment = FnExperiment::new("power", |p: &ParameterSnapshot| {
            let v = p.get("voltage").unwrap_or_default();
            let i = p.get("current").unwrap_or_default();
            Ok(Observation::Scalar(v * i))
        });
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        algorithm
            .add_parameter(Arc::new(voltage.clone()), Some(Bounds::new(0.0, 1.0)), None)
            .unwrap();
        algorithm
            .add_parameter(Arc::new(current.clone()), Some(Bounds::new(0.0, 1.0)), None)
            .unwrap();
        (algorithm, voltage, current)
    }

    #[test]
    fn invalid_parameter_name() {
        let experiment = FnExperiment::new("empty", |_: &ParameterSnapshot| Ok(0.0.into()));
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        let err = algorithm
            .add_parameter_named("parameter", None, None)
            .unwrap_err();
        assert!(matches!(err, OptError::UnknownParameter { .. }));
    }

    #[test]
    fn named_parameter_takes_experiment_bounds() {
        let mut experiment =
            FnExperiment::new("lab", |_: &ParameterSnapshot| Ok(Observation::Scalar(0.0)));
        experiment
            .add_new_parameter("voltage", 0.0, Bounds::new(0.25, 0.75))
            .unwrap();
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        algorithm
            .add_parameter_named("voltage", None, None)
            .unwrap();
        assert_eq!(
            algorithm.space().bounds("voltage").unwrap(),
            Bounds::new(0.25, 0.75)
        );
    }

    #[test]
    fn bounds_resolution_order() {
        let (mut algorithm, _) = quadratic();

        let free = SharedParameter::new("free", 0.0);
        let err = algorithm
            .add_parameter(Arc::new(free.clone()), None, None)
            .unwrap_err();
        assert!(matches!(err, OptError::MissingBounds { .. }));
        assert_eq!(algorithm.dim(), 1);

        algorithm
            .add_parameter(Arc::new(free), None, Some(vec![0.4, -0.2, 0.9]))
            .unwrap();
        assert_eq!(
            algorithm.space().bounds("free").unwrap(),
            Bounds::new(-0.2, 0.9)
        );

        let intrinsic = SharedParameter::new("phase", 0.0).with_bounds(0.0, 6.0);
        algorithm
            .add_parameter(Arc::new(intrinsic), None, None)
            .unwrap();
        assert_eq!(
            algorithm.space().bounds("phase").unwrap(),
            Bounds::new(0.0, 6.0)
        );
    }

    #[test]
    fn actuation_writes_every_parameter() {
        let (algorithm, voltage, current) = two_parameter();
        algorithm
            .actuate(&UnitPoint::new(vec![0.3, 0.8]))
            .unwrap();
        assert!((voltage.get() - 0.3).abs() < 1e-12);
        assert!((current.get() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn measure_appends_one_row_per_call() {
        let (mut algorithm, x) = quadratic();
        for (i, u) in [0.0, 0.25, 1.0].iter().enumerate() {
            let result = algorithm.measure(&UnitPoint::new(vec![*u])).unwrap();
            let expected = (-1.0 + 2.0 * u) * (-1.0 + 2.0 * u);
            assert!((result - expected).abs() < 1e-12);
            assert_eq!(algorithm.dataset().len(), i + 1);
        }
        assert_eq!(algorithm.dataset().observations(), 3);
        assert_eq!(x.get(), 1.0);
        assert_eq!(
            algorithm.dataset().columns(),
            &["x".to_string(), "result".to_string()]
        );
    }

    #[test]
    fn out_of_bounds_aborts_without_recording() {
        let (mut algorithm, voltage, _) = two_parameter();
        algorithm.measure(&UnitPoint::new(vec![0.5, 0.5])).unwrap();

        let err = algorithm
            .measure(&UnitPoint::new(vec![0.2, 1.5]))
            .unwrap_err();
        match err {
            OptError::OutOfBounds { parameter, .. } => assert_eq!(parameter, "current"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(algorithm.dataset().len(), 1);
        // nothing was written either
        assert_eq!(voltage.get(), 0.5);
    }

    #[test]
    fn tolerance_admits_rounding_noise() {
        let (mut algorithm, _) = quadratic();
        assert!(algorithm
            .measure(&UnitPoint::new(vec![1.0 + 1e-8]))
            .is_ok());
        assert!(algorithm
            .measure(&UnitPoint::new(vec![1.0 + 1e-6]))
            .is_err());
    }

    #[test]
    fn structured_results_extend_rows() {
        let x = SharedParameter::new("x", 0.0);
        let experiment = FnExperiment::new("spectrum", |p: &ParameterSnapshot| {
            let x = p.get("x").unwrap_or_default();
            Ok(Observation::Table(vec![
                Record::new().with("frequency", 1.0).with("result", x),
                Record::new().with("frequency", 2.0).with("result", 2.0 * x),
            ]))
        });
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        algorithm
            .add_parameter(Arc::new(x), Some(Bounds::new(0.0, 1.0)), None)
            .unwrap();

        let result = algorithm.measure(&UnitPoint::new(vec![0.5])).unwrap();
        assert_eq!(result, 1.0);
        let data = algorithm.dataset();
        assert_eq!(data.len(), 2);
        assert_eq!(data.observations(), 1);
        assert_eq!(
            data.columns(),
            &["x".to_string(), "frequency".to_string(), "result".to_string()]
        );
        assert_eq!(data.column("x").unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn structured_result_requires_result_column() {
        let x = SharedParameter::new("x", 0.0);
        let experiment = FnExperiment::new("broken", |_: &ParameterSnapshot| {
            Ok(Observation::Table(vec![Record::new().with("signal", 1.0)]))
        });
        let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
        algorithm
            .add_parameter(Arc::new(x), Some(Bounds::new(0.0, 1.0)), None)
            .unwrap();
        let err = algorithm.measure(&UnitPoint::new(vec![0.5])).unwrap_err();
        assert!(matches!(err, OptError::MissingResultColumn { .. }));
        assert!(algorithm.dataset().is_empty());
    }

    #[test]
    fn dependent_variables_become_columns() {
        let (mut algorithm, _) = quadratic();
        let temperature = SharedParameter::new("temperature", 21.5);
        algorithm.add_dependent(Arc::new(temperature));
        algorithm.measure(&UnitPoint::new(vec![0.5])).unwrap();
        assert_eq!(algorithm.dataset().value(0, "temperature"), Some(21.5));
    }

    #[test]
    fn settle_delay_is_honoured() {
        let (mut algorithm, _, _) = two_parameter();
        algorithm
            .set_delay("voltage", Duration::from_millis(20))
            .unwrap();
        algorithm
            .set_delay("current", Duration::from_millis(20))
            .unwrap();
        assert!(algorithm
            .set_delay("missing", Duration::from_millis(1))
            .is_err());

        let start = Instant::now();
        algorithm.measure(&UnitPoint::new(vec![0.1, 0.1])).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn batch_keeps_input_order_without_actuating() {
        let (mut algorithm, voltage, current) = two_parameter();
        let points: Vec<UnitPoint> = (0..10)
            .map(|i| UnitPoint::new(vec![i as f64 / 10.0, 1.0]))
            .collect();

        let results = algorithm.measure_batch(&points, 4).unwrap();
        let expected: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();
        for (r, e) in results.iter().zip(&expected) {
            assert!((r - e).abs() < 1e-12);
        }
        assert_eq!(algorithm.dataset().len(), 10);
        assert_eq!(algorithm.dataset().column("voltage").unwrap().len(), 10);
        assert_eq!(voltage.get(), 0.0);
        assert_eq!(current.get(), 0.0);
    }

    #[test]
    fn batch_fails_fast_on_any_out_of_bounds_point() {
        let (mut algorithm, _, _) = two_parameter();
        let points = vec![
            UnitPoint::new(vec![0.5, 0.5]),
            UnitPoint::new(vec![-0.5, 0.5]),
        ];
        assert!(matches!(
            algorithm.measure_batch(&points, 2),
            Err(OptError::OutOfBounds { .. })
        ));
        assert!(algorithm.dataset().is_empty());
    }

    #[test]
    fn batch_rejects_dependents() {
        let (mut algorithm, _) = quadratic();
        algorithm.add_dependent(SharedParameter::new("t", 1.0).into_shared());
        let err = algorithm
            .measure_batch(&[UnitPoint::new(vec![0.5])], 2)
            .unwrap_err();
        assert!(matches!(err, OptError::Config(_)));
    }

    #[test]
    fn zero_workers_uses_configured_pool_size() {
        let (tx, rx) = unbounded();
        let (algorithm, _) = quadratic();
        let mut algorithm = algorithm.with_events(tx);
        algorithm.config.workers = 3;
        algorithm
            .measure_batch(&[UnitPoint::new(vec![0.0]), UnitPoint::new(vec![1.0])], 0)
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            RunEvent::BatchRecorded {
                points: 2,
                workers: 3,
                ..
            }
        ));
    }

    #[test]
    fn bounds_update_and_filter_emit_events() {
        let (tx, rx) = unbounded();
        let (algorithm, _) = quadratic();
        let mut algorithm = algorithm.with_events(tx);
        for u in [0.0, 0.5, 1.0] {
            algorithm.measure(&UnitPoint::new(vec![u])).unwrap();
        }

        algorithm
            .apply_bounds(&BoundsUpdate::new().set("x", Bounds::new(-0.5, 0.5)))
            .unwrap();
        assert_eq!(algorithm.space().bounds("x").unwrap(), Bounds::new(-0.5, 0.5));
        assert!(algorithm
            .apply_bounds(&BoundsUpdate::new().set("y", Bounds::new(0.0, 1.0)))
            .is_err());

        let removed = algorithm.apply_filter(&RowFilter::below("result", 0.5)).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(algorithm.dataset().column("x").unwrap(), vec![0.0]);

        let events: Vec<RunEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[3], RunEvent::BoundsUpdated { .. }));
        assert!(matches!(
            events[4],
            RunEvent::RowsPruned {
                removed: 2,
                retained: 1,
                ..
            }
        ));
        assert!(events.iter().all(|e| e.run_id() == algorithm.id()));
    }

    #[test]
    fn fork_shares_parameters_but_not_rows() {
        let (mut algorithm, x) = quadratic();
        algorithm.measure(&UnitPoint::new(vec![0.5])).unwrap();

        let mut child = algorithm.fork();
        assert!(child.dataset().is_empty());
        assert_ne!(child.id(), algorithm.id());
        child.measure(&UnitPoint::new(vec![1.0])).unwrap();
        assert_eq!(x.get(), 1.0);

        algorithm.merge(child.into_dataset()).unwrap();
        assert_eq!(algorithm.dataset().column("x").unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn best_point_is_lowest_result() {
        let (mut algorithm, _) = quadratic();
        for u in [0.0, 0.5, 0.75] {
            algorithm.measure(&UnitPoint::new(vec![u])).unwrap();
        }
        assert_eq!(algorithm.best_point().unwrap().as_slice(), &[0.0]);
        let normalized = algorithm.data_normalized().unwrap();
        assert_eq!(normalized.column("x").unwrap(), vec![0.0, 0.5, 0.75]);
    }

    struct Sweep(Vec<f64>);

    impl Search for Sweep {
        fn name(&self) -> &str {
            "sweep"
        }

        fn run(&mut self, objective: &mut dyn Objective) -> OptResult<()> {
            for &u in &self.0 {
                objective.measure(&UnitPoint::new(vec![u]))?;
            }
            Ok(())
        }
    }

    #[test]
    fn background_run_returns_the_algorithm() {
        let (algorithm, _) = quadratic();
        let handle = algorithm.spawn(Sweep(vec![0.0, 0.5, 1.0])).unwrap();
        let finished = handle.join().unwrap();
        assert!(finished.result.is_ok());
        assert_eq!(finished.owner.dataset().len(), 3);
    }
}
