// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sp-demo - competing increment clients serialized by a distributed lock

use anyhow::{ensure, Result};
use clap::Parser;
use sp_demo::DemoConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "sp-demo",
    version,
    about = "Increment a shared value from competing clients under a lock"
)]
struct Cli {
    /// Config file (default: <config dir>/sandpiper/demo.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of competing increment clients
    #[arg(long)]
    clients: Option<usize>,

    /// Address of the value store
    #[arg(long)]
    service: Option<String>,

    /// Name of the lock guarding the value
    #[arg(long)]
    lock: Option<String>,

    /// Broker address, for display only
    #[arg(long)]
    bus: Option<String>,

    /// Longest waiter queue per lock
    #[arg(long)]
    max_waiters: Option<usize>,
}

impl Cli {
    fn apply(self, mut config: DemoConfig) -> DemoConfig {
        if let Some(clients) = self.clients {
            config.clients = clients;
        }
        if let Some(service) = self.service {
            config.service_address = service;
        }
        if let Some(lock) = self.lock {
            config.lock_name = lock;
        }
        if let Some(bus) = self.bus {
            config.bus_address = bus;
        }
        if let Some(max_waiters) = self.max_waiters {
            config.locks.max_waiters = Some(max_waiters);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let config = DemoConfig::discover(cli.config.as_deref())?;
    let config = cli.apply(config);
    config.validate()?;

    tokio::select! {
        report = sp_demo::run(&config) => {
            let report = report?;
            println!("Final value: {}", report.final_value);
            ensure!(
                report.failures() == 0,
                "{} of {} clients failed to increment",
                report.failures(),
                report.outcomes.len()
            );
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
            anyhow::bail!("interrupted");
        }
    }

    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
