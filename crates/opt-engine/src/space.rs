//! Parameter registry and the normalization engine.
//!
//! Coordinates map affinely between physical units and the unit hypercube:
//! `unit = (phys - min) / (max - min)`. A zero-width axis is pinned: it
//! normalizes to 0 and unnormalizes to `min` whatever the input.

use std::sync::Arc;
use std::time::Duration;

use opt_types::{
    Bounds, Dataset, OptError, OptResult, Parameter, ParameterSnapshot, PhysicalPoint, UnitPoint,
};

/// One registered parameter.
#[derive(Clone)]
pub struct ParameterEntry {
    pub parameter: Arc<dyn Parameter>,
    pub bounds: Bounds,
    /// Explicit grid points overriding uniform sampling, in physical units.
    pub points: Option<Vec<f64>>,
    /// Settle time after this parameter is written.
    pub delay: Option<Duration>,
}

impl ParameterEntry {
    pub fn name(&self) -> &str {
        self.parameter.name()
    }
}

impl std::fmt::Debug for ParameterEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterEntry")
            .field("name", &self.name())
            .field("bounds", &self.bounds)
            .field("points", &self.points)
            .field("delay", &self.delay)
            .finish()
    }
}

/// Ordered parameter registry with bounds; the coordinate frame of a run.
#[derive(Debug, Clone, Default)]
pub struct SearchSpace {
    entries: Vec<ParameterEntry>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `parameter`. Re-registering a name replaces its entry in
    /// place (last write wins) and keeps its position.
    pub fn register(
        &mut self,
        parameter: Arc<dyn Parameter>,
        bounds: Bounds,
        points: Option<Vec<f64>>,
    ) -> OptResult<()> {
        bounds.validate(parameter.name())?;
        match self.position(parameter.name()) {
            Some(i) => {
                let delay = self.entries[i].delay;
                self.entries[i] = ParameterEntry {
                    parameter,
                    bounds,
                    points,
                    delay,
                };
            }
            None => self.entries.push(ParameterEntry {
                parameter,
                bounds,
                points,
                delay: None,
            }),
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ParameterEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name() == name)
    }

    pub fn entry(&self, name: &str) -> OptResult<&ParameterEntry> {
        self.entries
            .iter()
            .find(|e| e.name() == name)
            .ok_or_else(|| OptError::UnknownParameter {
                name: name.to_string(),
            })
    }

    pub fn bounds(&self, name: &str) -> OptResult<Bounds> {
        self.entry(name).map(|e| e.bounds)
    }

    pub fn set_bounds(&mut self, name: &str, bounds: Bounds) -> OptResult<Bounds> {
        bounds.validate(name)?;
        let i = self.position(name).ok_or_else(|| OptError::UnknownParameter {
            name: name.to_string(),
        })?;
        let previous = self.entries[i].bounds;
        self.entries[i].bounds = bounds;
        Ok(previous)
    }

    pub fn set_delay(&mut self, name: &str, delay: Duration) -> OptResult<()> {
        let i = self.position(name).ok_or_else(|| OptError::UnknownParameter {
            name: name.to_string(),
        })?;
        self.entries[i].delay = Some(delay);
        Ok(())
    }

    fn check_dim(&self, actual: usize) -> OptResult<()> {
        if actual != self.dim() {
            return Err(OptError::DimensionMismatch {
                expected: self.dim(),
                actual,
            });
        }
        Ok(())
    }

    pub fn normalize(&self, point: &PhysicalPoint) -> OptResult<UnitPoint> {
        self.check_dim(point.len())?;
        let coords = self
            .entries
            .iter()
            .zip(point.iter())
            .map(|(e, &x)| normalize_axis(&e.bounds, x))
            .collect();
        Ok(UnitPoint::new(coords))
    }

    pub fn unnormalize(&self, point: &UnitPoint) -> OptResult<PhysicalPoint> {
        self.check_dim(point.len())?;
        let coords = self
            .entries
            .iter()
            .zip(point.iter())
            .map(|(e, &u)| unnormalize_axis(&e.bounds, u))
            .collect();
        Ok(PhysicalPoint::new(coords))
    }

    /// Normalize a single physical value along `axis`.
    pub fn normalize_coordinate(&self, axis: usize, x: f64) -> OptResult<f64> {
        let entry = self.entries.get(axis).ok_or(OptError::DimensionMismatch {
            expected: self.dim(),
            actual: axis + 1,
        })?;
        Ok(normalize_axis(&entry.bounds, x))
    }

    /// Normalize `n` points. Every row is width-checked before any is
    /// transformed.
    pub fn normalize_batch(&self, points: &[PhysicalPoint]) -> OptResult<Vec<UnitPoint>> {
        for p in points {
            self.check_dim(p.len())?;
        }
        points.iter().map(|p| self.normalize(p)).collect()
    }

    pub fn unnormalize_batch(&self, points: &[UnitPoint]) -> OptResult<Vec<PhysicalPoint>> {
        for p in points {
            self.check_dim(p.len())?;
        }
        points.iter().map(|p| self.unnormalize(p)).collect()
    }

    /// Fail with `OutOfBounds` on the first coordinate outside its bounds.
    pub fn check(&self, point: &PhysicalPoint, tolerance: f64) -> OptResult<()> {
        self.check_dim(point.len())?;
        for (entry, &value) in self.entries.iter().zip(point.iter()) {
            if !entry.bounds.contains(value, tolerance) {
                return Err(OptError::OutOfBounds {
                    parameter: entry.name().to_string(),
                    value,
                    min: entry.bounds.min,
                    max: entry.bounds.max,
                });
            }
        }
        Ok(())
    }

    /// Live values of every registered parameter, in registration order.
    pub fn live_point(&self) -> PhysicalPoint {
        PhysicalPoint::new(self.entries.iter().map(|e| e.parameter.get()).collect())
    }

    pub fn live_snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot::capture(self.entries.iter().map(|e| &e.parameter))
    }

    /// Snapshot describing `point` without touching live parameters.
    pub fn snapshot_of(&self, point: &PhysicalPoint) -> OptResult<ParameterSnapshot> {
        self.check_dim(point.len())?;
        Ok(self
            .entries
            .iter()
            .zip(point.iter())
            .map(|(e, &v)| (e.name().to_string(), v))
            .collect())
    }

    /// Copy of `data` with every parameter column mapped into unit space.
    pub fn normalize_dataset(&self, data: &Dataset) -> OptResult<Dataset> {
        let mut normalized = data.clone();
        if data.is_empty() {
            return Ok(normalized);
        }
        for entry in &self.entries {
            let bounds = entry.bounds;
            normalized.map_column(entry.name(), |x| normalize_axis(&bounds, x))?;
        }
        Ok(normalized)
    }
}

fn normalize_axis(bounds: &Bounds, x: f64) -> f64 {
    if bounds.is_degenerate() {
        0.0
    } else {
        (x - bounds.min) / bounds.width()
    }
}

fn unnormalize_axis(bounds: &Bounds, u: f64) -> f64 {
    if bounds.is_degenerate() {
        bounds.min
    } else {
        bounds.min + u * bounds.width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opt_types::{Record, SharedParameter};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn space() -> SearchSpace {
        let mut space = SearchSpace::new();
        space
            .register(
                SharedParameter::new("voltage", 0.5).into_shared(),
                Bounds::new(0.25, 0.75),
                None,
            )
            .unwrap();
        space
            .register(
                SharedParameter::new("current", 0.5).into_shared(),
                Bounds::new(0.5, 1.0),
                None,
            )
            .unwrap();
        space
    }

    #[test]
    fn corners_map_exactly() {
        let space = space();
        let cases = [
            ([0.25, 0.5], [0.0, 0.0]),
            ([0.25, 1.0], [0.0, 1.0]),
            ([0.75, 0.5], [1.0, 0.0]),
            ([0.75, 1.0], [1.0, 1.0]),
        ];
        for (phys, unit) in cases {
            let n = space.normalize(&PhysicalPoint::new(phys.to_vec())).unwrap();
            assert_eq!(n.as_slice(), &unit);
            let u = space.unnormalize(&UnitPoint::new(unit.to_vec())).unwrap();
            assert_eq!(u.as_slice(), &phys);
        }
    }

    #[test]
    fn round_trip_within_tolerance() {
        let space = space();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let q = UnitPoint::new(vec![rng.random_range(0.0..=1.0), rng.random_range(0.0..=1.0)]);
            let back = space.normalize(&space.unnormalize(&q).unwrap()).unwrap();
            for (a, b) in q.iter().zip(back.iter()) {
                assert!((a - b).abs() < 1e-7);
            }

            let p = PhysicalPoint::new(vec![
                rng.random_range(0.25..=0.75),
                rng.random_range(0.5..=1.0),
            ]);
            let back = space.unnormalize(&space.normalize(&p).unwrap()).unwrap();
            for (a, b) in p.iter().zip(back.iter()) {
                assert!((a - b).abs() < 1e-7);
            }
        }
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let space = space();
        let err = space
            .normalize(&PhysicalPoint::new(vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            OptError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(space.unnormalize(&UnitPoint::new(vec![0.5])).is_err());

        let batch = vec![UnitPoint::new(vec![0.0, 0.0]), UnitPoint::new(vec![1.0])];
        assert!(space.unnormalize_batch(&batch).is_err());
    }

    #[test]
    fn batch_preserves_shape_and_order() {
        let space = space();
        let batch = vec![
            UnitPoint::new(vec![0.0, 1.0]),
            UnitPoint::new(vec![0.5, 0.5]),
            UnitPoint::new(vec![1.0, 0.0]),
        ];
        let phys = space.unnormalize_batch(&batch).unwrap();
        assert_eq!(phys.len(), 3);
        assert_eq!(phys[1].as_slice(), &[0.5, 0.75]);
        let back = space.normalize_batch(&phys).unwrap();
        assert_eq!(back, batch);
    }

    #[test]
    fn degenerate_axis_is_pinned() {
        let mut space = SearchSpace::new();
        space
            .register(
                SharedParameter::new("fixed", 2.0).into_shared(),
                Bounds::new(2.0, 2.0),
                None,
            )
            .unwrap();
        let n = space.normalize(&PhysicalPoint::new(vec![2.0])).unwrap();
        assert_eq!(n[0], 0.0);
        let u = space.unnormalize(&UnitPoint::new(vec![0.7])).unwrap();
        assert_eq!(u[0], 2.0);
    }

    #[test]
    fn reregistering_overwrites_bounds_in_place() {
        let mut space = space();
        space
            .register(
                SharedParameter::new("voltage", 0.0).into_shared(),
                Bounds::new(-1.0, 1.0),
                None,
            )
            .unwrap();
        assert_eq!(space.dim(), 2);
        assert_eq!(space.names(), vec!["voltage", "current"]);
        assert_eq!(space.bounds("voltage").unwrap(), Bounds::new(-1.0, 1.0));
    }

    #[test]
    fn check_names_offending_parameter() {
        let space = space();
        let err = space
            .check(&PhysicalPoint::new(vec![0.5, 1.2]), 1e-7)
            .unwrap_err();
        match err {
            OptError::OutOfBounds { parameter, .. } => assert_eq!(parameter, "current"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(space.check(&PhysicalPoint::new(vec![0.75, 1.0]), 1e-7).is_ok());
    }

    #[test]
    fn dataset_parameter_columns_are_normalized() {
        let space = space();
        let mut data = Dataset::new();
        data.push_observation(&[Record::new()
            .with("voltage", 0.75)
            .with("current", 0.5)
            .with("result", 4.0)])
            .unwrap();
        let normalized = space.normalize_dataset(&data).unwrap();
        assert_eq!(normalized.value(0, "voltage"), Some(1.0));
        assert_eq!(normalized.value(0, "current"), Some(0.0));
        assert_eq!(normalized.value(0, "result"), Some(4.0));
        // source untouched
        assert_eq!(data.value(0, "voltage"), Some(0.75));
    }
}
