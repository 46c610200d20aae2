//! Gradient descent with central finite-difference gradients.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use opt_engine::{Objective, Search};
use opt_types::{OptError, OptResult, UnitPoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientDescentConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    /// Finite-difference step, in unit coordinates.
    pub dither_size: f64,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            learning_rate: 1e-3,
            dither_size: 1e-2,
        }
    }
}

impl GradientDescentConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_dither_size(mut self, dither_size: f64) -> Self {
        self.dither_size = dither_size;
        self
    }
}

/// Fixed-iteration gradient descent starting from the live parameter values.
///
/// Each iteration costs `2 * dim` probe measurements plus one measurement at
/// the updated point. There is no convergence test.
#[derive(Debug, Clone, Default)]
pub struct GradientDescent {
    config: GradientDescentConfig,
    position: Option<UnitPoint>,
}

impl GradientDescent {
    pub fn new(config: GradientDescentConfig) -> Self {
        Self {
            config,
            position: None,
        }
    }

    pub fn config(&self) -> &GradientDescentConfig {
        &self.config
    }

    /// Where the last run ended, in unit coordinates.
    pub fn position(&self) -> Option<&UnitPoint> {
        self.position.as_ref()
    }

    /// Estimate the gradient at `x` by measuring `x ± dither` along each axis.
    pub fn gradient(&self, objective: &mut dyn Objective, x: &UnitPoint) -> OptResult<Vec<f64>> {
        let eps = self.config.dither_size;
        (0..x.len())
            .map(|d| {
                let c1 = objective.measure(&x.offset(d, eps))?;
                let c2 = objective.measure(&x.offset(d, -eps))?;
                Ok((c1 - c2) / (2.0 * eps))
            })
            .collect()
    }

    fn validate(&self) -> OptResult<()> {
        if !(self.config.dither_size > 0.0) {
            return Err(OptError::Config(format!(
                "dither size must be positive, got {}",
                self.config.dither_size
            )));
        }
        if !self.config.learning_rate.is_finite() {
            return Err(OptError::Config("learning rate must be finite".to_string()));
        }
        Ok(())
    }
}

impl Search for GradientDescent {
    fn name(&self) -> &str {
        "gradient_descent"
    }

    fn run(&mut self, objective: &mut dyn Objective) -> OptResult<()> {
        self.validate()?;
        let mut x = objective.current_point()?;
        info!(
            "Gradient descent from {:?} for {} iterations",
            x.as_slice(),
            self.config.iterations
        );

        for i in 0..self.config.iterations {
            let g = self.gradient(objective, &x)?;
            for (d, gd) in g.iter().enumerate() {
                x[d] -= self.config.learning_rate * gd;
            }
            let cost = objective.measure(&x)?;
            debug!("Iteration {}: cost {} at {:?}", i, cost, x.as_slice());
            self.position = Some(x.clone());
        }
        Ok(())
    }
}
