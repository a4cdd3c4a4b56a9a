// SPDX-License-Identifier: Apache-2.0
//! Backup driver

use anyhow::Result;
use clap::{
    App,
    load_yaml,
};
use env_logger::Env;
use borg_push::{
    job,
    Config,
    RunOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let yaml = load_yaml!("cli.yaml");
    let matches = App::from_yaml(yaml).get_matches();

    let mut config = Config::from_env();
    if let Some(borg) = matches.value_of("borg") {
        config.borg = borg.into();
    }

    if matches.is_present("show-config") {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let options = RunOptions {
        pretend: matches.is_present("pretend"),
        print_metrics: matches.is_present("print-metrics"),
    };

    log::info!("Starting backup run for instance {}", config.instance_name);
    job::run(&config, &options).await?;
    Ok(())
}
