// SPDX-License-Identifier: Apache-2.0
//! One backup run.
//!
//! Init (if enabled), create, prune and compact, then gather the
//! repository facts and report them.  Every step must succeed for the next
//! one to run, apart from the init, whose failure is expected once the
//! repository exists.

use anyhow::{bail, Result};
use chrono::{format::{Item, StrftimeItems}, DateTime, Local, Utc};
use log::info;
use regex::{Captures, Regex};

use crate::actions::{BorgCompact, BorgCreate, BorgPrune, Runner};
use crate::borg::Borg;
use crate::checked::CheckedExt;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::push::Pushgateway;
use crate::size::folder_size;

pub const CREATE_TIME: &str = "borg_create_backup_time";
pub const PRUNE_TIME: &str = "borg_prune_backup_time";
pub const COMPACT_TIME: &str = "borg_compact_backup_time";

static DEFAULT_TIME_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Print the borg commands instead of running them.
    pub pretend: bool,

    /// Print the metrics to stdout.  The repository facts are gathered for
    /// this even when pushing is disabled.
    pub print_metrics: bool,
}

/// Perform a full run, returning the metrics it gathered.
pub async fn run(config: &Config, options: &RunOptions) -> Result<Metrics> {
    let borg = Borg::from_config(config);
    info!("Backing up {} to {} (encryption {})", config.prod_path, config.backup_path,
        if config.encryption_enabled() { "enabled" } else { "disabled" });

    if config.auto_init {
        if options.pretend {
            println!("would: {}", borg.init_cmd().command_line());
        } else {
            borg.init().await;
        }
    }

    let metrics = Metrics::new(&config.instance_name)?;
    let archive = render_archive_name(&config.snapshot_name, Local::now())?;

    let mut runner = Runner::new();
    runner.push(CREATE_TIME, "Seconds used to create the backup.",
        Box::new(BorgCreate::new(&borg, &config.prod_path, &archive)));
    runner.push(PRUNE_TIME, "Seconds used to prune the backup.",
        Box::new(BorgPrune::new(&borg, &config.retention)));
    runner.push(COMPACT_TIME, "Seconds used to compact the backup.",
        Box::new(BorgCompact::new(&borg)));
    runner.run(&metrics, options.pretend).await?;

    if options.pretend {
        return Ok(metrics);
    }

    if config.push.enabled || options.print_metrics {
        record_repository(&borg, config, &metrics).await?;
    }

    if options.print_metrics {
        print!("{}", metrics.render()?);
    }

    if config.push.enabled {
        Pushgateway::new(&config.push)?.push(&metrics).await?;
    } else {
        info!("Pushgateway disabled, not pushing metrics");
    }

    info!("done");
    Ok(metrics)
}

async fn record_repository(borg: &Borg, config: &Config, metrics: &Metrics) -> Result<()> {
    let facts = borg.list().await?.facts()?;
    info!("Repository {} holds {} archives", borg.repo(), facts.archives);
    metrics.record_repository(&facts)?;

    let backup = config.backup_path.clone();
    let backup = tokio::task::spawn_blocking(move || folder_size(backup)).await?;
    let prod = config.prod_path.clone();
    let prod = tokio::task::spawn_blocking(move || folder_size(prod)).await?;
    info!("Backup folder {} bytes, production folder {} bytes", backup, prod);
    metrics.record_folder_sizes(backup, prod)
}

/// Expand the time placeholders of an archive name template.
///
/// `{now}` and `{utcnow}` become the local and UTC time, and take an
/// optional strftime format, as in `{now:%Y-%m-%d}`.  Any other
/// placeholder is left for borg to expand.
pub fn render_archive_name(template: &str, now: DateTime<Local>) -> Result<String> {
    let re = Regex::new(r"\{(now|utcnow)(?::([^}]*))?\}")?;

    for caps in re.captures_iter(template) {
        if let Some(format) = caps.get(2) {
            let format = microsecond_fraction(format.as_str());
            if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
                bail!("Invalid time format {:?} in archive name {:?}", &caps[2], template);
            }
        }
    }

    let name = re.replace_all(template, |caps: &Captures| {
        let format = caps.get(2)
            .map_or_else(|| DEFAULT_TIME_FORMAT.to_string(), |m| microsecond_fraction(m.as_str()));
        if &caps[1] == "utcnow" {
            now.with_timezone(&Utc).format(&format).to_string()
        } else {
            now.format(&format).to_string()
        }
    });
    Ok(name.into_owned())
}

/// Borg's `%f` is six digits of microseconds.  chrono's is nine digits of
/// nanoseconds, so rewrite it as `%6f`.  `%%` is a literal and is copied as
/// is.
fn microsecond_fraction(format: &str) -> String {
    let mut result = String::with_capacity(format.len() + 1);
    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        result.push(ch);
        if ch == '%' {
            match chars.next() {
                Some('f') => result.push_str("6f"),
                Some(next) => result.push(next),
                None => (),
            }
        }
    }
    result
}
