//! Inclusive physical ranges for parameters.

use serde::{Deserialize, Serialize};

use crate::errors::{OptError, OptResult};

/// Inclusive `[min, max]` range a parameter may take during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Build bounds for `parameter`, rejecting inverted or non-finite ranges.
    pub fn checked(parameter: &str, min: f64, max: f64) -> OptResult<Self> {
        let bounds = Self { min, max };
        bounds.validate(parameter)?;
        Ok(bounds)
    }

    /// Smallest range covering every value in `points`.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[f64]) -> Option<Self> {
        let mut iter = points.iter().copied();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    pub fn validate(&self, parameter: &str) -> OptResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(OptError::InvalidBounds {
                parameter: parameter.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// A zero-width range pins its parameter to `min`.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0
    }

    /// Inclusive containment with `tolerance` slack on both ends.
    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.min - tolerance && value <= self.max + tolerance
    }

    pub fn is_subset_of(&self, other: &Bounds) -> bool {
        self.min >= other.min && self.max <= other.max
    }

    /// Clamp this range into `outer`. Never widens `self`.
    pub fn restrict_to(&self, outer: &Bounds) -> Self {
        let min = self.min.max(outer.min).min(outer.max);
        let max = self.max.min(outer.max).max(min);
        Self { min, max }
    }
}

impl From<(f64, f64)> for Bounds {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = Bounds::checked("x", 1.0, 0.0).unwrap_err();
        assert!(matches!(err, OptError::InvalidBounds { .. }));
        assert!(Bounds::checked("x", 0.0, 0.0).is_ok());
        assert!(Bounds::checked("x", f64::NAN, 1.0).is_err());
    }

    #[test]
    fn from_points_spans_extremes() {
        let bounds = Bounds::from_points(&[0.3, -2.0, 5.5, 1.0]).unwrap();
        assert_eq!(bounds, Bounds::new(-2.0, 5.5));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn containment_honours_tolerance() {
        let bounds = Bounds::new(0.0, 1.0);
        assert!(bounds.contains(1.0, 0.0));
        assert!(bounds.contains(1.0 + 5e-8, 1e-7));
        assert!(!bounds.contains(1.0 + 5e-7, 1e-7));
        assert!(!bounds.contains(-0.01, 1e-7));
    }

    #[test]
    fn restrict_never_widens() {
        let outer = Bounds::new(0.0, 1.0);
        let wide = Bounds::new(-1.0, 0.5);
        let restricted = wide.restrict_to(&outer);
        assert_eq!(restricted, Bounds::new(0.0, 0.5));
        assert!(restricted.is_subset_of(&outer));
    }
}
