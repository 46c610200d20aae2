//! Events emitted while a run progresses, for external consumption
//! (logging, dashboards, tests).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bounds::Bounds;

/// Unique run identifier.
pub type RunId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    MeasurementRecorded {
        run_id: RunId,
        observation: usize,
        parameters: Vec<f64>,
        result: f64,
    },
    BatchRecorded {
        run_id: RunId,
        points: usize,
        workers: usize,
    },
    StageStarted {
        run_id: RunId,
        stage: usize,
        name: String,
    },
    StageCompleted {
        run_id: RunId,
        stage: usize,
        rows: usize,
    },
    StageFailed {
        run_id: RunId,
        stage: usize,
        error: String,
    },
    BoundsUpdated {
        run_id: RunId,
        parameter: String,
        previous: Bounds,
        current: Bounds,
    },
    RowsPruned {
        run_id: RunId,
        removed: usize,
        retained: usize,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            Self::MeasurementRecorded { run_id, .. }
            | Self::BatchRecorded { run_id, .. }
            | Self::StageStarted { run_id, .. }
            | Self::StageCompleted { run_id, .. }
            | Self::StageFailed { run_id, .. }
            | Self::BoundsUpdated { run_id, .. }
            | Self::RowsPruned { run_id, .. } => *run_id,
        }
    }
}
