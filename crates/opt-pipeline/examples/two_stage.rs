//! Coarse grid, zoom, fine grid, then a few Gaussian-process guided
//! measurements on a simulated two-parameter resonance.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p opt-pipeline --example two_stage
//! ```

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opt_engine::{Algorithm, AlgorithmConfig};
use opt_pipeline::{GaussianProcess, GaussianProcessConfig, Loop, Model, Pipeline, Zoom};
use opt_search::{GridSearch, GridSearchConfig, SearchConfig};
use opt_types::{Bounds, FnExperiment, Observation, Parameter, ParameterSnapshot};

fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

fn main() -> Result<()> {
    enable_tracing();

    let mut experiment = FnExperiment::new("resonance", |p: &ParameterSnapshot| {
        let f = p.get("frequency").unwrap_or_default();
        let g = p.get("gain").unwrap_or_default();
        let signal = (-(f - 3.2).powi(2) / 0.5).exp() * (-(g - 0.6).powi(2) / 0.1).exp();
        Ok(Observation::Scalar(-signal))
    });
    let frequency = experiment.add_new_parameter("frequency", 0.0, Bounds::new(0.0, 10.0))?;
    let gain = experiment.add_new_parameter("gain", 0.0, Bounds::new(0.0, 1.0))?;

    let mut algorithm = Algorithm::new(experiment.into_shared(), AlgorithmConfig::default());
    algorithm.add_parameter_named("frequency", None, None)?;
    algorithm.add_parameter_named("gain", None, None)?;

    let fine: SearchConfig = serde_json::from_str(r#"{"grid": {"steps": 8}}"#)?;
    let model = Model::new(GaussianProcess::new(
        GaussianProcessConfig::default()
            .with_length_scale(0.2)
            .with_noise(1e-3),
    ))
    .with_search(GridSearch::with_steps(25));

    let mut pipeline = Pipeline::new(algorithm)
        .with_block(GridSearch::new(GridSearchConfig::default().with_steps(10).parallel(4)))
        .with_block(Zoom::new(0.5)?)
        .with_block(fine)
        .with_block(Loop::times(5).with_block(model));
    pipeline.run()?;

    let algorithm = pipeline.algorithm();
    let best = algorithm
        .best_point()
        .ok_or_else(|| anyhow::anyhow!("no measurements recorded"))?;
    info!(
        "Best after {} measurements: frequency={:.3} gain={:.3}",
        algorithm.dataset().len(),
        best[0],
        best[1]
    );
    info!(
        "Live values: frequency={:.3} gain={:.3}",
        frequency.get(),
        gain.get()
    );

    let batch = algorithm.dataset().to_record_batch()?;
    info!("Exported {} rows x {} columns", batch.num_rows(), batch.num_columns());
    Ok(())
}
