// SPDX-License-Identifier: Apache-2.0
//! Actions runner.
//!
//! The runner holds a sequence of steps, each an action with the name and
//! help text of the summary its duration is recorded under.  Steps run in
//! order, and the first failure ends the run.

use anyhow::{Context, Result};
use log::{error, info};
use std::time::Instant;

use super::Action;
use crate::metrics::Metrics;

struct Step {
    name: String,
    help: String,
    action: Box<dyn Action>,
}

pub struct Runner {
    steps: Vec<Step>,
}

impl Runner {
    pub fn new() -> Runner {
        Runner {
            steps: Vec::new(),
        }
    }

    /// Add a new action, to be performed after previously added actions.
    /// Its duration is recorded as the summary `name`.
    pub fn push(&mut self, name: &str, help: &str, action: Box<dyn Action>) {
        self.steps.push(Step {
            name: name.into(),
            help: help.into(),
            action,
        });
    }

    /// Perform all of the actions, timing each into `metrics`.  The summary
    /// for a step is registered before the step runs, and observed only if
    /// it succeeds.  An error names the step and its command.  With
    /// `pretend`, the commands are only printed.
    pub async fn run(self, metrics: &Metrics, pretend: bool) -> Result<()> {
        for mut step in self.steps.into_iter() {
            if pretend {
                println!("would: {}", step.action.describe());
                continue;
            }

            let summary = metrics.summary(&step.name, &step.help)?;
            let start = Instant::now();
            match step.action.perform().await {
                Ok(()) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    info!("{} took {:.3}s", step.name, elapsed);
                    summary.observe(elapsed);
                }
                Err(err) => {
                    error!("Error with {}: {:?}", step.name, err);
                    return Err(err).with_context(|| {
                        format!("{} failed: {}", step.name, step.action.describe())
                    });
                }
            }
        }

        Ok(())
    }
}
