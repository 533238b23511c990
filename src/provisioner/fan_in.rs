//! Completion-counting fan-in shared by every parallel stage.
//!
//! A stage launches K tasks and then collects exactly K completions. A task
//! that errors or panics still produces one completion, so the collector can
//! neither hang on a missing signal nor stop early.

use std::future::Future;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::error::{ProvisionError, Stage};

/// Tagged result of one unit of work
#[derive(Debug)]
pub enum StageOutcome<T> {
    Ok(T),
    Failed(ProvisionError),
}

impl<T> From<Result<T, ProvisionError>> for StageOutcome<T> {
    fn from(result: Result<T, ProvisionError>) -> Self {
        match result {
            Ok(value) => StageOutcome::Ok(value),
            Err(err) => StageOutcome::Failed(err),
        }
    }
}

/// Set of launched tasks awaiting their completions
pub struct FanIn<T> {
    stage: Stage,
    tasks: JoinSet<Result<T, ProvisionError>>,
    launched: usize,
}

impl<T: Send + 'static> FanIn<T> {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            tasks: JoinSet::new(),
            launched: 0,
        }
    }

    /// Spawn one unit of work
    pub fn launch<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, ProvisionError>> + Send + 'static,
    {
        self.tasks.spawn(task);
        self.launched += 1;
    }

    /// Block until every launched task has completed, in completion order
    pub async fn gather(mut self) -> Vec<StageOutcome<T>> {
        let mut outcomes = Vec::with_capacity(self.launched);

        while outcomes.len() < self.launched {
            let Some(joined) = self.tasks.join_next().await else {
                break;
            };
            let outcome = match joined {
                Ok(result) => StageOutcome::from(result),
                Err(join_err) => StageOutcome::Failed(ProvisionError::TaskPanicked {
                    stage: self.stage,
                    reason: join_err.to_string(),
                }),
            };
            outcomes.push(outcome);
        }

        debug!(
            stage = %self.stage,
            launched = self.launched,
            completed = outcomes.len(),
            "all tasks reported"
        );
        outcomes
    }

    /// Gather and keep only the successes, logging every failure
    pub async fn successes(self) -> Vec<T> {
        let stage = self.stage;
        self.gather()
            .await
            .into_iter()
            .filter_map(|outcome| match outcome {
                StageOutcome::Ok(value) => Some(value),
                StageOutcome::Failed(err) => {
                    let stage = err.stage().unwrap_or(stage);
                    warn!(stage = %stage, error = %err, "unit dropped");
                    None
                }
            })
            .collect()
    }
}
