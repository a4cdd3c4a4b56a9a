// SPDX-License-Identifier: Apache-2.0
//! The metrics registry for a run.
//!
//! One registry is built per run, filled in as the steps complete, and
//! then pushed (or printed) as a whole.

use anyhow::Result;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{Encoder, Gauge, IntGauge, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex, PoisonError};

use crate::inspect::RepoFacts;

pub const NUMBER_OF_BACKUPS: &str = "borg_number_of_backups";
pub const FIRST_BACKUP: &str = "borg_first_backup_timestamp";
pub const LAST_BACKUP: &str = "borg_last_backup_timestamp";
pub const BACKUP_FOLDER_SIZE: &str = "borg_backup_folder_size";
pub const PRODUCTION_FOLDER_SIZE: &str = "borg_production_folder_size";
pub const INSTANCE_INFO: &str = "instance_info";

#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
}

impl Metrics {
    /// A fresh registry, holding only the instance record.
    pub fn new(instance: &str) -> Result<Metrics> {
        let registry = Registry::new();
        let info = IntGauge::with_opts(
            Opts::new(INSTANCE_INFO, "Backup instance information.")
                .const_label("name", instance))?;
        info.set(1);
        registry.register(Box::new(info))?;
        Ok(Metrics { registry })
    }

    /// Register a new timing summary.
    pub fn summary(&self, name: &str, help: &str) -> Result<Summary> {
        let summary = Summary::new(name, help)?;
        self.registry.register(Box::new(summary.clone()))?;
        Ok(summary)
    }

    pub fn record_repository(&self, facts: &RepoFacts) -> Result<()> {
        self.int_gauge(NUMBER_OF_BACKUPS, "Number of snapshots in borg repository.",
            i64::try_from(facts.archives)?)?;
        if let Some(first) = facts.first {
            self.gauge(FIRST_BACKUP, "Timestamp of first snapshot in repository.", first)?;
        }
        if let Some(last) = facts.last {
            self.gauge(LAST_BACKUP, "Timestamp of last snapshot in repository.", last)?;
        }
        Ok(())
    }

    pub fn record_folder_sizes(&self, backup: u64, production: u64) -> Result<()> {
        self.int_gauge(BACKUP_FOLDER_SIZE, "Size of the borg backup repository folder.",
            i64::try_from(backup)?)?;
        self.int_gauge(PRODUCTION_FOLDER_SIZE, "Size of the production folder.",
            i64::try_from(production)?)?;
        Ok(())
    }

    fn gauge(&self, name: &str, help: &str, value: f64) -> Result<()> {
        let gauge = Gauge::new(name, help)?;
        gauge.set(value);
        self.registry.register(Box::new(gauge))?;
        Ok(())
    }

    fn int_gauge(&self, name: &str, help: &str, value: i64) -> Result<()> {
        let gauge = IntGauge::new(name, help)?;
        gauge.set(value);
        self.registry.register(Box::new(gauge))?;
        Ok(())
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// The registry in the text exposition format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        Ok(buf)
    }

    pub fn render(&self) -> Result<String> {
        Ok(String::from_utf8(self.encode()?)?)
    }
}

/// A summary without quantiles: just the count and sum of observations.
#[derive(Clone)]
pub struct Summary {
    desc: Desc,
    samples: Arc<Mutex<(u64, f64)>>,
}

impl Summary {
    pub fn new(name: &str, help: &str) -> Result<Summary> {
        Ok(Summary {
            desc: Desc::new(name.into(), help.into(), vec![], HashMap::new())?,
            samples: Arc::new(Mutex::new((0, 0.0))),
        })
    }

    pub fn observe(&self, value: f64) {
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        samples.0 += 1;
        samples.1 += value;
    }

    pub fn count(&self) -> u64 {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    pub fn sum(&self) -> f64 {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}

impl Collector for Summary {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut summary = proto::Summary::default();
        summary.set_sample_count(self.count());
        summary.set_sample_sum(self.sum());

        let mut metric = proto::Metric::default();
        metric.set_summary(summary);

        let mut family = MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);
        family.mut_metric().push(metric);
        vec![family]
    }
}
