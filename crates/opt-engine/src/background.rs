//! Threaded run mode.
//!
//! The owner is moved onto a background thread for the duration of the run
//! and handed back on join, so one instance can never have two overlapping
//! runs. There is no cancellation; a run ends when its search returns.

use std::thread::JoinHandle;

use tracing::{error, info};

use opt_types::{OptError, OptResult};

/// Result of a background run: the owner plus the run's outcome.
#[derive(Debug)]
pub struct Finished<T> {
    pub owner: T,
    pub result: OptResult<()>,
}

/// Handle to a run executing on its own thread.
#[derive(Debug)]
pub struct BackgroundRun<T> {
    name: String,
    handle: JoinHandle<Finished<T>>,
}

impl<T: Send + 'static> BackgroundRun<T> {
    pub fn spawn<F>(name: String, mut owner: T, run: F) -> OptResult<Self>
    where
        F: FnOnce(&mut T) -> OptResult<()> + Send + 'static,
    {
        info!("Starting background run {}", name);
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let result = run(&mut owner);
                Finished { owner, result }
            })
            .map_err(|e| OptError::Internal(format!("failed to spawn {name}: {e}")))?;
        Ok(Self { name, handle })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the run ends.
    ///
    /// Fails only if the run thread panicked, in which case the owner is lost.
    pub fn join(self) -> OptResult<Finished<T>> {
        let name = self.name;
        let finished = self.handle.join().map_err(|_| {
            error!("Background run {} panicked", name);
            OptError::Internal(format!("background run {name} panicked"))
        })?;
        if let Err(e) = &finished.result {
            error!("Background run {} failed: {}", name, e);
        } else {
            info!("Background run {} completed", name);
        }
        Ok(finished)
    }
}
