// SPDX-License-Identifier: Apache-2.0
//! Repository inspection.
//!
//! Parses the output of `borg list --json` and derives the facts reported
//! about the repository.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Deserialize;

/// The parsed output of `borg list --json`.  Borg emits a good deal more
/// than this, which is ignored.
#[derive(Debug, Deserialize)]
pub struct Listing {
    pub archives: Vec<Archive>,
}

#[derive(Debug, Deserialize)]
pub struct Archive {
    #[serde(default)]
    pub name: String,

    /// When the archive was created, as borg prints it.
    pub time: String,
}

/// What gets reported about the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoFacts {
    pub archives: usize,

    /// Timestamps of the oldest and newest archive, in seconds since the
    /// epoch.  None for an empty repository.
    pub first: Option<f64>,
    pub last: Option<f64>,
}

impl Listing {
    pub fn from_json(data: &[u8]) -> Result<Listing> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn facts(&self) -> Result<RepoFacts> {
        let mut first: Option<f64> = None;
        let mut last: Option<f64> = None;

        for archive in &self.archives {
            let stamp = parse_time(&archive.time)
                .with_context(|| format!("Archive {:?}", archive.name))?;
            first = Some(first.map_or(stamp, |f| f.min(stamp)));
            last = Some(last.map_or(stamp, |l| l.max(stamp)));
        }

        Ok(RepoFacts {
            archives: self.archives.len(),
            first,
            last,
        })
    }
}

/// Convert a borg timestamp to seconds since the epoch.  Borg writes local
/// time without an offset, `2023-01-01T00:00:00.000000`, which is
/// interpreted in the local timezone.  Times with an explicit offset are
/// taken as they are.
pub fn parse_time(text: &str) -> Result<f64> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(epoch_seconds(time.timestamp(), time.timestamp_subsec_nanos()));
    }

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .with_context(|| format!("Invalid archive time {:?}", text))?;
    let time = Local.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("Archive time {:?} does not exist in the local timezone", text))?;
    Ok(epoch_seconds(time.timestamp(), time.timestamp_subsec_nanos()))
}

fn epoch_seconds(secs: i64, nanos: u32) -> f64 {
    secs as f64 + nanos as f64 / 1e9
}
