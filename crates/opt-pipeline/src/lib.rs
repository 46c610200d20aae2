//! # opt-pipeline
//!
//! Composable exploration pipelines. A [`Pipeline`] owns one
//! [`Algorithm`](opt_engine::Algorithm) and runs its [`Block`]s in order:
//! searches measure the experiment, [`Prune`] and [`Zoom`] narrow the shared
//! dataset and bounds, [`Loop`] repeats a block sequence, and a [`Model`]
//! fits a [`Surrogate`] to the data, searches the surrogate instead of the
//! experiment, and measures once at the suggested point.

mod blocks;
mod gaussian_process;
mod model;
mod pipeline;
mod status;

pub use blocks::{Block, Loop, Prune, Repeat, Zoom};
pub use gaussian_process::{GaussianProcess, GaussianProcessConfig};
pub use model::{FnSurrogate, Model, Prediction, Surrogate, SurrogateObjective, UNCERTAINTY_COLUMN};
pub use pipeline::Pipeline;
pub use status::{PipelineState, PipelineStatus};
