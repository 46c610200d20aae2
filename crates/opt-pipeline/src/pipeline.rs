//! Multi-stage pipeline execution.
//!
//! States: `Idle -> Running { block } -> Idle | Failed`. Stages run strictly
//! one after another against the pipeline's [`Algorithm`]; the first failure
//! halts the run and nothing is retried.

use tracing::{error, info, warn};

use opt_engine::{Algorithm, BackgroundRun};
use opt_types::{OptError, OptResult, RunEvent, RunId};

use crate::blocks::{Block, Loop, Repeat};
use crate::status::PipelineStatus;

/// An ordered sequence of blocks sharing one experiment, parameter registry,
/// bounds map and dataset.
#[derive(Debug)]
pub struct Pipeline {
    algorithm: Algorithm,
    blocks: Vec<Block>,
    status: PipelineStatus,
}

impl Pipeline {
    pub fn new(algorithm: Algorithm) -> Self {
        let status = PipelineStatus::new(algorithm.id());
        Self {
            algorithm,
            blocks: Vec::new(),
            status,
        }
    }

    pub fn with_block(mut self, block: impl Into<Block>) -> Self {
        self.blocks.push(block.into());
        self
    }

    pub fn add_block(&mut self, block: impl Into<Block>) {
        self.blocks.push(block.into());
    }

    pub fn id(&self) -> RunId {
        self.algorithm.id()
    }

    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// Mutable access for registration between runs.
    pub fn algorithm_mut(&mut self) -> &mut Algorithm {
        &mut self.algorithm
    }

    pub fn into_algorithm(self) -> Algorithm {
        self.algorithm
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    /// Run every block in order.
    pub fn run(&mut self) -> OptResult<()> {
        let Pipeline {
            algorithm,
            blocks,
            status,
        } = self;

        info!(
            "Starting pipeline {} with {} blocks",
            algorithm.id(),
            blocks.len()
        );
        status.mark_started();

        let mut runner = StageRunner {
            algorithm,
            status,
            stage: 0,
        };
        let result = runner.run_blocks(blocks);
        let stages = runner.stage;
        if let Err(e) = result {
            self.status.mark_failed(e.to_string());
            return Err(e);
        }

        self.status.mark_completed();
        info!(
            "Pipeline {} completed {} stages, {} rows",
            self.algorithm.id(),
            stages,
            self.algorithm.dataset().len()
        );
        Ok(())
    }

    /// Run on a background thread. The pipeline comes back from
    /// [`BackgroundRun::join`].
    pub fn spawn(self) -> OptResult<BackgroundRun<Pipeline>> {
        let name = format!("opt-pipeline-{}", self.id());
        BackgroundRun::spawn(name, self, |pipeline| pipeline.run())
    }
}

struct StageRunner<'a> {
    algorithm: &'a mut Algorithm,
    status: &'a mut PipelineStatus,
    /// Stages started so far, counting every leaf block execution.
    stage: usize,
}

impl StageRunner<'_> {
    fn run_blocks(&mut self, blocks: &mut [Block]) -> OptResult<()> {
        for block in blocks.iter_mut() {
            match block {
                Block::Loop(l) => self.run_loop(l)?,
                leaf => self.run_stage(leaf)?,
            }
        }
        Ok(())
    }

    fn run_loop(&mut self, l: &mut Loop) -> OptResult<()> {
        match l.repeat {
            Repeat::Count(count) => {
                for i in 0..count {
                    info!("Loop iteration {}/{}", i + 1, count);
                    self.run_blocks(&mut l.blocks)?;
                }
            }
            Repeat::Continuous => {
                if l.blocks.is_empty() {
                    return Err(OptError::Config(
                        "continuous loop needs at least one block".to_string(),
                    ));
                }
                warn!("Entering continuous loop; it ends only when a stage fails");
                let mut i = 0usize;
                loop {
                    i += 1;
                    info!("Loop iteration {}", i);
                    self.run_blocks(&mut l.blocks)?;
                }
            }
        }
        Ok(())
    }

    fn run_stage(&mut self, block: &mut Block) -> OptResult<()> {
        let stage = self.stage;
        self.stage += 1;
        let name = block.name();
        let run_id = self.algorithm.id();

        info!("Stage {} ({}) started", stage, name);
        self.status.mark_running(stage);
        self.algorithm.emit(RunEvent::StageStarted {
            run_id,
            stage,
            name: name.clone(),
        });

        match self.execute(block) {
            Ok(()) => {
                let rows = self.algorithm.dataset().len();
                info!("Stage {} ({}) completed, {} rows", stage, name, rows);
                self.status.mark_stage_completed(self.algorithm.best().cloned());
                self.algorithm.emit(RunEvent::StageCompleted { run_id, stage, rows });
                Ok(())
            }
            Err(e) => {
                error!("Stage {} ({}) failed: {}", stage, name, e);
                self.algorithm.emit(RunEvent::StageFailed {
                    run_id,
                    stage,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn execute(&mut self, block: &mut Block) -> OptResult<()> {
        let algorithm = &mut *self.algorithm;
        match block {
            Block::Search(search) => {
                let mut child = algorithm.fork();
                let outcome = child.run(search.as_mut());
                // rows measured before a failure are kept
                let merged = algorithm.merge(child.into_dataset());
                outcome?;
                merged
            }
            Block::Model(model) => {
                let normalized = algorithm.data_normalized()?;
                model.fit(
                    &normalized,
                    &algorithm.space().names(),
                    algorithm.result_column(),
                )?;
                let suggestion = model.optimize(
                    algorithm.space(),
                    algorithm.config().tolerance,
                    algorithm.result_column(),
                )?;
                algorithm.measure(&suggestion)?;
                Ok(())
            }
            Block::Prune(prune) => {
                let filter = prune.plan(algorithm.dataset(), algorithm.result_column())?;
                algorithm.apply_filter(&filter)?;
                Ok(())
            }
            Block::Zoom(zoom) => {
                let update = zoom.plan(
                    algorithm.dataset(),
                    algorithm.space(),
                    algorithm.result_column(),
                )?;
                algorithm.apply_bounds(&update)
            }
            Block::Loop(l) => self.run_loop(l),
        }
    }
}
