// SPDX-License-Identifier: Apache-2.0
//! Actions related to borg backup

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::process::Stdio;
use tokio::process::Command;

use crate::borg::{Borg, Retention};
use crate::checked::CheckedExt;
use super::Action;

/// An action that creates a new archive of the source tree.
pub struct BorgCreate {
    borg: Borg,

    /// The directory being backed up.
    source: String,

    /// The name of the new archive.
    archive: String,
}

impl BorgCreate {
    pub fn new(borg: &Borg, source: &str, archive: &str) -> BorgCreate {
        BorgCreate {
            borg: borg.clone(),
            source: source.into(),
            archive: archive.into(),
        }
    }

    fn cmd(&self) -> Command {
        self.borg.create_cmd(&self.archive, &self.source)
    }
}

#[async_trait]
impl Action for BorgCreate {
    async fn perform(&mut self) -> Result<()> {
        info!("Running borg backup of {} to {}", self.source, self.archive);
        run(self.cmd()).await
    }

    fn describe(&self) -> String {
        self.cmd().command_line()
    }
}

/// An action that prunes the repository down to the retention policy.
pub struct BorgPrune {
    borg: Borg,
    retention: Retention,
}

impl BorgPrune {
    pub fn new(borg: &Borg, retention: &Retention) -> BorgPrune {
        BorgPrune {
            borg: borg.clone(),
            retention: retention.clone(),
        }
    }

    fn cmd(&self) -> Command {
        self.borg.prune_cmd(&self.retention)
    }
}

#[async_trait]
impl Action for BorgPrune {
    async fn perform(&mut self) -> Result<()> {
        info!("Pruning {}", self.borg.repo());
        run(self.cmd()).await
    }

    fn describe(&self) -> String {
        self.cmd().command_line()
    }
}

/// An action that frees the space left behind by a prune.
pub struct BorgCompact {
    borg: Borg,
}

impl BorgCompact {
    pub fn new(borg: &Borg) -> BorgCompact {
        BorgCompact { borg: borg.clone() }
    }
}

#[async_trait]
impl Action for BorgCompact {
    async fn perform(&mut self) -> Result<()> {
        info!("Compacting {}", self.borg.repo());
        run(self.borg.compact_cmd()).await
    }

    fn describe(&self) -> String {
        self.borg.compact_cmd().command_line()
    }
}

/// Run a borg command with its output going to our own.
async fn run(mut cmd: Command) -> Result<()> {
    info!("Running {}", cmd.command_line());
    cmd.stdin(Stdio::null())
        .checked_run().await
}
