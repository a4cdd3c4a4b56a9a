//! Borg backup driver with Prometheus Pushgateway reporting.

pub use anyhow::Result;

pub use checked::CheckedExt;
pub use borg::{Borg, Credential, Retention};
pub use config::{Config, PushConfig, Secret};
pub use inspect::{Listing, RepoFacts};
pub use job::{render_archive_name, RunOptions};
pub use metrics::Metrics;
pub use push::Pushgateway;
pub use size::folder_size;

pub mod actions;
pub mod job;

mod borg;
mod checked;
mod config;
mod inspect;
mod metrics;
mod push;
mod size;
