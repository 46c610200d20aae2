//! Coordinates tagged with the space they live in.
//!
//! A [`PhysicalPoint`] holds raw parameter values; a [`UnitPoint`] holds the
//! same coordinates mapped into the unit hypercube. Both are index-aligned to
//! parameter registration order.

use serde::{Deserialize, Serialize};

macro_rules! point_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Vec<f64>);

        impl $name {
            pub fn new(coords: Vec<f64>) -> Self {
                Self(coords)
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn as_slice(&self) -> &[f64] {
                &self.0
            }

            pub fn iter(&self) -> std::slice::Iter<'_, f64> {
                self.0.iter()
            }

            pub fn into_inner(self) -> Vec<f64> {
                self.0
            }
        }

        impl From<Vec<f64>> for $name {
            fn from(coords: Vec<f64>) -> Self {
                Self(coords)
            }
        }

        impl From<&[f64]> for $name {
            fn from(coords: &[f64]) -> Self {
                Self(coords.to_vec())
            }
        }

        impl std::ops::Index<usize> for $name {
            type Output = f64;

            fn index(&self, i: usize) -> &f64 {
                &self.0[i]
            }
        }

        impl std::ops::IndexMut<usize> for $name {
            fn index_mut(&mut self, i: usize) -> &mut f64 {
                &mut self.0[i]
            }
        }
    };
}

point_type!(PhysicalPoint, "A point in physical parameter units.");
point_type!(UnitPoint, "A point in normalized `[0, 1]^d` coordinates.");

impl UnitPoint {
    /// The point displaced by `delta` along `axis`.
    pub fn offset(&self, axis: usize, delta: f64) -> Self {
        let mut coords = self.0.clone();
        coords[axis] += delta;
        Self(coords)
    }
}
