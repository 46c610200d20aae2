//! Gaussian-process regression with fixed hyper-parameters.
//!
//! Kernel: `amplitude * exp(-|a - b|^2 / (2 * length_scale^2))` plus `noise`
//! on the diagonal. Targets are centred on their mean before solving.

use serde::{Deserialize, Serialize};
use tracing::debug;

use opt_types::{OptError, OptResult, UnitPoint};

use crate::model::{Prediction, Surrogate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianProcessConfig {
    pub amplitude: f64,
    pub length_scale: f64,
    pub noise: f64,
}

impl Default for GaussianProcessConfig {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            length_scale: 1.0,
            noise: 0.1,
        }
    }
}

impl GaussianProcessConfig {
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_length_scale(mut self, length_scale: f64) -> Self {
        self.length_scale = length_scale;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    fn validate(&self) -> OptResult<()> {
        if !(self.amplitude > 0.0 && self.amplitude.is_finite()) {
            return Err(OptError::Config(format!(
                "amplitude must be positive, got {}",
                self.amplitude
            )));
        }
        if !(self.length_scale > 0.0 && self.length_scale.is_finite()) {
            return Err(OptError::Config(format!(
                "length scale must be positive, got {}",
                self.length_scale
            )));
        }
        if !(self.noise >= 0.0 && self.noise.is_finite()) {
            return Err(OptError::Config(format!(
                "noise must be non-negative, got {}",
                self.noise
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    inputs: Vec<Vec<f64>>,
    /// Lower Cholesky factor of the training covariance.
    chol: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    mean: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GaussianProcess {
    config: GaussianProcessConfig,
    fitted: Option<Fitted>,
}

impl GaussianProcess {
    pub fn new(config: GaussianProcessConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn config(&self) -> &GaussianProcessConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn kernel(&self, a: &[f64], b: &[f64]) -> f64 {
        let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
        self.config.amplitude * (-0.5 * d2 / self.config.length_scale.powi(2)).exp()
    }
}

impl Surrogate for GaussianProcess {
    fn name(&self) -> &str {
        "gaussian_process"
    }

    fn fit(&mut self, inputs: &[Vec<f64>], costs: &[f64]) -> OptResult<()> {
        self.config.validate()?;
        if inputs.is_empty() {
            return Err(OptError::SurrogateFit("no training points".to_string()));
        }
        if inputs.len() != costs.len() {
            return Err(OptError::DimensionMismatch {
                expected: inputs.len(),
                actual: costs.len(),
            });
        }
        let dim = inputs[0].len();
        if let Some(bad) = inputs.iter().find(|x| x.len() != dim) {
            return Err(OptError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }
        if costs.iter().any(|c| !c.is_finite()) {
            return Err(OptError::SurrogateFit("non-finite cost in training data".to_string()));
        }

        let n = inputs.len();
        let mut cov = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..=i {
                let k = self.kernel(&inputs[i], &inputs[j]);
                cov[i][j] = k;
                cov[j][i] = k;
            }
            cov[i][i] += self.config.noise;
        }

        let chol = cholesky(&cov).ok_or_else(|| {
            OptError::SurrogateFit("covariance matrix is not positive definite".to_string())
        })?;
        let mean = costs.iter().sum::<f64>() / n as f64;
        let centred: Vec<f64> = costs.iter().map(|c| c - mean).collect();
        let alpha = solve_upper_transposed(&chol, &solve_lower(&chol, &centred));

        debug!("Gaussian process fitted on {} points ({} dims)", n, dim);
        self.fitted = Some(Fitted {
            inputs: inputs.to_vec(),
            chol,
            alpha,
            mean,
        });
        Ok(())
    }

    fn predict(&self, point: &UnitPoint) -> OptResult<Prediction> {
        let fitted = self.fitted.as_ref().ok_or(OptError::SurrogateNotFitted)?;
        let dim = fitted.inputs[0].len();
        if point.len() != dim {
            return Err(OptError::DimensionMismatch {
                expected: dim,
                actual: point.len(),
            });
        }

        let k_star: Vec<f64> = fitted
            .inputs
            .iter()
            .map(|x| self.kernel(x, point.as_slice()))
            .collect();
        let estimate = fitted.mean + dot(&k_star, &fitted.alpha);
        let v = solve_lower(&fitted.chol, &k_star);
        let variance = (self.config.amplitude - dot(&v, &v)).max(0.0);

        Ok(Prediction {
            estimate,
            uncertainty: variance.sqrt(),
        })
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Lower-triangular `L` with `L * L^T == a`, or `None` if `a` is not
/// positive definite.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let s: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = a[i][i] - s;
                if !(d > 0.0) {
                    return None;
                }
                l[i][i] = d.sqrt();
            } else {
                l[i][j] = (a[i][j] - s) / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve `L z = b` by forward substitution.
fn solve_lower(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut z = vec![0.0; n];
    for i in 0..n {
        let s: f64 = (0..i).map(|k| l[i][k] * z[k]).sum();
        z[i] = (b[i] - s) / l[i][i];
    }
    z
}

/// Solve `L^T x = z` by back substitution.
fn solve_upper_transposed(l: &[Vec<f64>], z: &[f64]) -> Vec<f64> {
    let n = z.len();
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let s: f64 = (i + 1..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (z[i] - s) / l[i][i];
    }
    x
}
