// SPDX-License-Identifier: Apache-2.0
//! The borg execution environment.
//!
//! A [`Borg`] knows which program to run, which repository to run it
//! against, and which credential to hand to each invocation.  Every command
//! line this crate runs is built here.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::process::Stdio;
use tokio::process::Command;

use crate::checked::CheckedExt;
use crate::config::{Config, Secret};
use crate::inspect::Listing;

static PASSPHRASE_VAR: &'static str = "BORG_PASSPHRASE";
static UNENCRYPTED_VAR: &'static str = "BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK";

/// How a single borg invocation is allowed into the repository.  This is
/// set on the child's environment only, never on our own, and never on the
/// command line.
#[derive(Debug, Clone)]
pub enum Credential {
    Passphrase(Secret),
    Unencrypted,
}

impl Credential {
    pub fn new(passphrase: Option<&Secret>) -> Credential {
        match passphrase {
            Some(secret) => Credential::Passphrase(secret.clone()),
            None => Credential::Unencrypted,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Credential::Passphrase(_))
    }

    fn apply(&self, cmd: &mut Command) {
        match self {
            Credential::Passphrase(secret) => cmd.env(PASSPHRASE_VAR, secret.expose()),
            Credential::Unencrypted => cmd.env(UNENCRYPTED_VAR, "yes"),
        };
    }
}

/// Prune retention.  A period with no value is left out of the prune
/// command entirely.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retention {
    pub hourly: Option<String>,
    pub daily: Option<String>,
    pub weekly: Option<String>,
    pub monthly: Option<String>,
}

impl Retention {
    /// The `--keep-*` flags, in hourly, daily, weekly, monthly order.
    pub fn flags(&self) -> Vec<String> {
        let periods = [
            ("hourly", &self.hourly),
            ("daily", &self.daily),
            ("weekly", &self.weekly),
            ("monthly", &self.monthly),
        ];
        periods
            .iter()
            .filter_map(|(period, value)| match value {
                Some(value) if !value.is_empty() => Some(format!("--keep-{}={}", period, value)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Borg {
    program: String,
    repo: String,
    credential: Credential,
}

impl Borg {
    pub fn new(program: &str, repo: &str, credential: Credential) -> Borg {
        Borg {
            program: program.into(),
            repo: repo.into(),
            credential,
        }
    }

    pub fn from_config(config: &Config) -> Borg {
        Borg::new(&config.borg, &config.backup_path,
            Credential::new(config.passphrase.as_ref()))
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// A borg command for the given subcommand and arguments, with the
    /// credential applied.
    pub fn command<S: AsRef<str>>(&self, sub: &str, args: &[S]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(sub);
        for arg in args {
            cmd.arg(arg.as_ref());
        }
        self.credential.apply(&mut cmd);
        cmd
    }

    pub fn init_cmd(&self) -> Command {
        let mode = if self.credential.is_encrypted() {
            "--encryption=repokey"
        } else {
            "--encryption=none"
        };
        self.command("init", &[mode, self.repo.as_str()])
    }

    pub fn create_cmd(&self, archive: &str, source: &str) -> Command {
        let dest = format!("{}::{}", self.repo, archive);
        self.command("create", &[dest.as_str(), source])
    }

    pub fn prune_cmd(&self, retention: &Retention) -> Command {
        let mut args = retention.flags();
        args.push("-v".into());
        args.push("--list".into());
        args.push(self.repo.clone());
        self.command("prune", &args)
    }

    pub fn compact_cmd(&self) -> Command {
        self.command("compact", &[self.repo.as_str()])
    }

    pub fn list_cmd(&self) -> Command {
        self.command("list", &["--json", self.repo.as_str()])
    }

    /// Try to initialize the repository.  Borg refuses when the repository
    /// already exists, so any failure here is only logged.
    pub async fn init(&self) {
        let mut cmd = self.init_cmd();
        if self.credential.is_encrypted() {
            info!("Trying to init encrypted repo {}", self.repo);
        } else {
            info!("Trying to init cleartext repo {}", self.repo);
        }
        info!("Running {}", cmd.command_line());
        match cmd.status().await {
            Ok(status) if status.success() => info!("Initialized repo {}", self.repo),
            Ok(status) => warn!("Init of {} returned {}, continuing", self.repo, status),
            Err(e) => warn!("Unable to run {}: {}, continuing", cmd.command_line(), e),
        }
    }

    /// Fetch the archive listing of the repository.
    pub async fn list(&self) -> Result<Listing> {
        let mut cmd = self.list_cmd();
        cmd.stdin(Stdio::null());
        info!("Running {}", cmd.command_line());
        let out = cmd.checked_output().await?;
        let stderr = String::from_utf8_lossy(&out.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            warn!("borg list: {}", line);
        }
        Listing::from_json(&out.stdout)
            .with_context(|| format!("Parsing output of borg list {}", self.repo))
    }
}
