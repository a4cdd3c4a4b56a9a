// SPDX-License-Identifier: Apache-2.0
//! Configuration.
//!
//! Every setting comes from the environment, and is resolved once, at
//! startup, into an immutable [`Config`].  An unset variable and one set to
//! the empty string are treated the same: the default is used.

use anyhow::Result;
use serde::{Serialize, Serializer};
use std::{env, fmt};

use crate::borg::Retention;

pub const BACKUP_PATH: &str = "BORG_BACKUP_BACKUP_PATH";
pub const PROD_PATH: &str = "BORG_BACKUP_PROD_PATH";
pub const AUTO_REPO_INIT_ENABLED: &str = "BORG_BACKUP_AUTO_REPO_INIT_ENABLED";
pub const ENCRYPTION_PASSPHRASE: &str = "BORG_BACKUP_ENCRYPTION_PASSPHRASE";
pub const KEEP_HOURLY: &str = "BORG_PRUNE_KEEP_HOURLY";
pub const KEEP_DAILY: &str = "BORG_PRUNE_KEEP_DAILY";
pub const KEEP_WEEKLY: &str = "BORG_PRUNE_KEEP_WEEKLY";
pub const KEEP_MONTHLY: &str = "BORG_PRUNE_KEEP_MONTHLY";
pub const SNAPSHOT_NAME: &str = "BORG_BACKUP_SNAPSHOT_NAME";
pub const INSTANCE_NAME: &str = "BORG_INSTANCE_NAME";
pub const PUSHGATEWAY_ENABLED: &str = "BORG_PROMETHEUS_PUSHGATEWAY_ENABLED";
pub const PUSHGATEWAY: &str = "BORG_PROMETHEUS_PUSHGATEWAY";
pub const PUSHGATEWAY_JOBNAME: &str = "BORG_PROMETHEUS_PUSHGATEWAY_JOBNAME";
pub const PUSHGATEWAY_USERNAME: &str = "BORG_PROMETHEUS_PUSHGATEWAY_USERNAME";
pub const PUSHGATEWAY_PASSWORD: &str = "BORG_PROMETHEUS_PUSHGATEWAY_PASSWORD";

static DEFAULT_BORG: &'static str = "borg";
static DEFAULT_BACKUP_PATH: &'static str = "/backup/borg_backup/";
static DEFAULT_PROD_PATH: &'static str = "/prod/";
static DEFAULT_KEEP_DAILY: &'static str = "7";
static DEFAULT_KEEP_WEEKLY: &'static str = "4";
static DEFAULT_SNAPSHOT_NAME: &'static str = "automatic-{now:%Y-%m-%dT%H:%M:%S}";
static DEFAULT_PUSHGATEWAY: &'static str = "prometheus-pushgateway:9091";
static DEFAULT_JOBNAME: &'static str = "push-borg";

/// A configured secret.  It never shows up in debug output or in the dumped
/// configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new<S: Into<String>>(text: S) -> Secret {
        Secret(text.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(********)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("********")
    }
}

/// The settings for one run.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// The borg executable.  Not an environment setting, overridden from
    /// the command line.
    pub borg: String,

    /// The borg repository.
    pub backup_path: String,

    /// The tree being backed up.
    pub prod_path: String,

    pub auto_init: bool,

    /// Encryption is enabled exactly when this is present.
    pub passphrase: Option<Secret>,

    pub retention: Retention,

    /// Archive name template, see [`crate::render_archive_name`].
    pub snapshot_name: String,

    pub instance_name: String,

    pub push: PushConfig,
}

/// Where, and whether, to push the metrics.
#[derive(Debug, Clone, Serialize)]
pub struct PushConfig {
    pub enabled: bool,
    pub address: String,
    pub job: String,
    pub username: Option<String>,
    pub password: Option<Secret>,
}

impl Config {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Config {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve the configuration through the given lookup function.
    pub fn from_lookup<F>(lookup: F) -> Config
        where F: Fn(&str) -> Option<String>
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let get_or = |name: &str, default: &str| {
            get(name).unwrap_or_else(|| default.to_string())
        };
        let flag = |name: &str| get_or(name, "yes") == "yes";

        Config {
            borg: DEFAULT_BORG.to_string(),
            backup_path: get_or(BACKUP_PATH, DEFAULT_BACKUP_PATH),
            prod_path: get_or(PROD_PATH, DEFAULT_PROD_PATH),
            auto_init: flag(AUTO_REPO_INIT_ENABLED),
            passphrase: get(ENCRYPTION_PASSPHRASE).map(Secret::new),
            retention: Retention {
                hourly: get(KEEP_HOURLY),
                daily: Some(get_or(KEEP_DAILY, DEFAULT_KEEP_DAILY)),
                weekly: Some(get_or(KEEP_WEEKLY, DEFAULT_KEEP_WEEKLY)),
                monthly: get(KEEP_MONTHLY),
            },
            snapshot_name: get_or(SNAPSHOT_NAME, DEFAULT_SNAPSHOT_NAME),
            instance_name: get(INSTANCE_NAME).unwrap_or_else(default_instance_name),
            push: PushConfig {
                enabled: flag(PUSHGATEWAY_ENABLED),
                address: get_or(PUSHGATEWAY, DEFAULT_PUSHGATEWAY),
                job: get_or(PUSHGATEWAY_JOBNAME, DEFAULT_JOBNAME),
                username: get(PUSHGATEWAY_USERNAME),
                password: get(PUSHGATEWAY_PASSWORD).map(Secret::new),
            },
        }
    }

    pub fn encryption_enabled(&self) -> bool {
        self.passphrase.is_some()
    }

    /// The resolved configuration as YAML, secrets redacted.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// The host name, used when no instance name is configured.
pub fn default_instance_name() -> String {
    sysinfo::System::host_name()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
