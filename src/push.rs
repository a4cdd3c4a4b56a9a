// SPDX-License-Identifier: Apache-2.0
//! Pushing metrics to a Prometheus Pushgateway.

use anyhow::{anyhow, Context, Result};
use log::info;
use prometheus::{Encoder, TextEncoder};
use reqwest::{header::CONTENT_TYPE, Client, Url};
use std::time::Duration;

use crate::config::{PushConfig, Secret};
use crate::metrics::Metrics;

static PUSH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Pushgateway {
    client: Client,
    url: Url,
    username: Option<String>,
    password: Option<Secret>,
}

impl Pushgateway {
    pub fn new(config: &PushConfig) -> Result<Pushgateway> {
        Ok(Pushgateway {
            client: Client::builder().timeout(PUSH_TIMEOUT).build()?,
            url: job_url(&config.address, &config.job)?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Replace the metrics of our job with the contents of the registry.
    pub async fn push(&self, metrics: &Metrics) -> Result<()> {
        info!("Pushing metrics to {}", self.url);
        let mut request = self.client
            .put(self.url.clone())
            .header(CONTENT_TYPE, TextEncoder::new().format_type())
            .body(metrics.encode()?);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            request = request.basic_auth(username, Some(password.expose()));
        }
        request.send().await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("Pushing metrics to {}", self.url))?;
        Ok(())
    }
}

/// The push URL for a job.  The gateway address is usually just
/// `host:port`, and is then reached over http.
fn job_url(address: &str, job: &str) -> Result<Url> {
    let base = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };
    let mut url = Url::parse(&base)
        .with_context(|| format!("Invalid pushgateway address {:?}", address))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Pushgateway address {:?} can't take a path", address))?
        .pop_if_empty()
        .extend(&["metrics", "job", job]);
    Ok(url)
}
