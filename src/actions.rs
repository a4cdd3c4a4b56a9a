// SPDX-License-Identifier: Apache-2.0
//! Backup actions.
//!
//! These actions are assembled into a sequence, and run by the [`Runner`],
//! which times each one.  The first action to fail stops the sequence.

use anyhow::Result;
use async_trait::async_trait;

pub use borg::{BorgCompact, BorgCreate, BorgPrune};
pub use runner::Runner;

mod borg;
mod runner;

#[async_trait]
pub trait Action: Send {
    async fn perform(&mut self) -> Result<()>;

    /// The command this action runs, for logs and pretend output.
    fn describe(&self) -> String;
}
