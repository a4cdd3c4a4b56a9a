// SPDX-License-Identifier: Apache-2.0
//! An extension to Command to allow checked runs.
//!
//! Errors describe the command by its program and arguments only.  The
//! `Debug` form of a `Command` also prints the environment set on it, which
//! is where the repository passphrase lives.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::process::Output;
use tokio::process::Command;

#[async_trait]
pub trait CheckedExt {
    /// Run the given command, normalizing to the local Result type, and returning a local error if
    /// the command doesn't return success.
    async fn checked_run(&mut self) -> Result<()>;

    /// Run command, collecting all of its output.  Runs Command's `output` method, with an
    /// additional check of the status result.
    async fn checked_output(&mut self) -> Result<Output>;

    /// The program and its arguments, for logs and error messages.
    fn command_line(&self) -> String;
}

#[async_trait]
impl CheckedExt for Command {
    async fn checked_run(&mut self) -> Result<()> {
        let status = self.status().await
            .map_err(|e| anyhow!("Unable to start {}: {}", self.command_line(), e))?;
        if !status.success() {
            return Err(anyhow!("Error running command: {} ({})", self.command_line(), status));
        }
        Ok(())
    }

    async fn checked_output(&mut self) -> Result<Output> {
        let out = self.output().await
            .map_err(|e| anyhow!("Unable to start {}: {}", self.command_line(), e))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(anyhow!("Error running command: {} ({}): {}",
                self.command_line(), out.status, stderr.trim()));
        }
        Ok(out)
    }

    fn command_line(&self) -> String {
        let cmd = self.as_std();
        let mut line = cmd.get_program().to_string_lossy().into_owned();
        for arg in cmd.get_args() {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}
