use std::{sync::Arc, time::Duration};

use clap::Parser;
use geofix_logic::{ArbiterSettings, LocationArbiter, LocationFix, UtcDT, prelude::*};
use geofix_providers::WanderProvider;
use log::info;
use serde::Serialize;

/// Coordinate a consumer substitutes when no estimate has been accepted
/// yet, so downstream queries still have something to work with
const FALLBACK_LATITUDE: f64 = 47.67399;
const FALLBACK_LONGITUDE: f64 = -122.12151;

#[derive(Parser)]
/// Runs simulated location providers through the arbiter and prints the
/// evolving estimate as JSON lines
struct Cli {
    /// Comma-separated names of the simulated providers to run
    #[arg(long, value_delimiter = ',', default_value = "gps,network")]
    providers: Vec<String>,

    /// Seconds between fixes from each provider
    #[arg(long, default_value_t = 5)]
    refresh_secs: u64,

    /// Seconds between estimate reads
    #[arg(long, default_value_t = 2)]
    poll_secs: u64,

    /// Seconds to run before shutting down
    #[arg(long, default_value_t = 30)]
    run_secs: u64,

    /// Starting latitude for every provider's walk
    #[arg(long, default_value_t = 47.60621)]
    latitude: f64,

    /// Starting longitude for every provider's walk
    #[arg(long, default_value_t = -122.33207)]
    longitude: f64,
}

#[derive(Serialize)]
struct EstimateLine {
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    provider: Option<String>,
    timestamp: Option<UtcDT>,
    fallback: bool,
}

impl EstimateLine {
    fn from_estimate(estimate: Option<LocationFix>) -> Self {
        match estimate {
            Some(fix) => Self {
                latitude: fix.latitude,
                longitude: fix.longitude,
                accuracy: Some(fix.accuracy),
                provider: fix.provider,
                timestamp: Some(fix.timestamp),
                fallback: false,
            },
            None => Self {
                latitude: FALLBACK_LATITUDE,
                longitude: FALLBACK_LONGITUDE,
                accuracy: None,
                provider: None,
                timestamp: None,
                fallback: true,
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();

    let providers = cli
        .providers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            // Later providers get progressively worse base accuracy so the
            // arbitration has something to arbitrate
            Arc::new(WanderProvider::new(
                name,
                (cli.latitude, cli.longitude),
                Duration::from_secs(cli.refresh_secs),
                10.0 + idx as f64 * 30.0,
            ))
        })
        .collect::<Vec<_>>();

    let arbiter = LocationArbiter::new(providers, ArbiterSettings::default());
    arbiter.start().await;

    info!("Arbitrating fixes from {} providers", cli.providers.len());

    let mut poll = tokio::time::interval(Duration::from_secs(cli.poll_secs));
    let deadline = tokio::time::sleep(Duration::from_secs(cli.run_secs));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            _ = poll.tick() => {
                let line = EstimateLine::from_estimate(arbiter.current_estimate());
                let json = serde_json::to_string(&line)
                    .context("Failed to serialize estimate line")?;
                println!("{json}");
            }
        }
    }

    arbiter.stop().await;

    Ok(())
}
