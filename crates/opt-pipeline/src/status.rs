use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opt_types::{Row, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Running { block: usize },
    Failed,
}

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub id: RunId,
    pub state: PipelineState,
    pub stages_completed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Lowest-cost row seen so far.
    pub best: Option<Row>,
}

impl PipelineStatus {
    pub fn new(id: RunId) -> Self {
        Self {
            id,
            state: PipelineState::Idle,
            stages_completed: 0,
            started_at: None,
            finished_at: None,
            error: None,
            best: None,
        }
    }

    pub fn mark_started(&mut self) {
        self.stages_completed = 0;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.error = None;
    }

    pub fn mark_running(&mut self, block: usize) {
        self.state = PipelineState::Running { block };
    }

    pub fn mark_stage_completed(&mut self, best: Option<Row>) {
        self.stages_completed += 1;
        self.best = best;
    }

    pub fn mark_completed(&mut self) {
        self.state = PipelineState::Idle;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = PipelineState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PipelineState::Running { .. })
    }

    pub fn is_failed(&self) -> bool {
        self.state == PipelineState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_lifecycle() {
        let mut status = PipelineStatus::new(Uuid::new_v4());
        assert_eq!(status.state, PipelineState::Idle);
        assert!(status.started_at.is_none());

        status.mark_started();
        status.mark_running(0);
        assert!(status.is_running());
        status.mark_stage_completed(None);
        status.mark_running(1);
        assert_eq!(status.state, PipelineState::Running { block: 1 });

        status.mark_failed("zoom found no rows".to_string());
        assert!(status.is_failed());
        assert_eq!(status.stages_completed, 1);
        assert!(status.finished_at.is_some());

        status.mark_started();
        assert!(status.error.is_none());
        assert_eq!(status.stages_completed, 0);
        status.mark_completed();
        assert_eq!(status.state, PipelineState::Idle);
    }
}
