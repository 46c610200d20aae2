//! The seams between search algorithms and whatever they measure.
//!
//! A [`Search`] only ever sees an [`Objective`]. The physical
//! [`Algorithm`](crate::Algorithm) is one objective; a surrogate model's
//! predict-backed evaluator is another. The same grid search can therefore
//! drive either the experiment or its cheap approximation.

use opt_types::{OptResult, UnitPoint};

use crate::space::SearchSpace;

/// Something a search can evaluate points against.
pub trait Objective {
    /// Coordinate frame of the objective.
    fn space(&self) -> &SearchSpace;

    /// Evaluate one point and record it. Returns the primary result.
    fn measure(&mut self, point: &UnitPoint) -> OptResult<f64>;

    /// Evaluate independent points. Results come back in input order and are
    /// recorded as one batch.
    fn measure_batch(&mut self, points: &[UnitPoint], _workers: usize) -> OptResult<Vec<f64>> {
        points.iter().map(|p| self.measure(p)).collect()
    }

    /// Current position in unit coordinates.
    fn current_point(&self) -> OptResult<UnitPoint> {
        let space = self.space();
        space.normalize(&space.live_point())
    }
}

/// A search strategy that can run as a pipeline stage.
pub trait Search: Send {
    /// Human-readable strategy name.
    fn name(&self) -> &str;

    /// Run to completion against `objective`.
    fn run(&mut self, objective: &mut dyn Objective) -> OptResult<()>;
}
