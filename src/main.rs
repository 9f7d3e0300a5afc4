//! Demo CLI: tracks simulated devices and reports reconciliation activity

use clap::Parser;
use rssi_tracker::backend::SimulatedBackend;
use rssi_tracker::config::TrackerConfig;
use rssi_tracker::tracker::Tracker;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "rssi-tracker",
    about = "Track simulated wireless devices from RSSI anchor measurements"
)]
struct Args {
    /// Seconds between poll cycles
    #[arg(long, default_value_t = 2)]
    interval_secs: u64,

    /// Number of poll cycles to run
    #[arg(long, default_value_t = 10)]
    cycles: u64,

    /// Number of simulated devices
    #[arg(long, default_value_t = 4)]
    devices: usize,

    /// RNG seed for the simulated backend
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// JSON config file overriding tracker defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_file(path)?,
        None => TrackerConfig::default(),
    };
    config.poll_interval_secs = args.interval_secs;

    let backend = Arc::new(SimulatedBackend::demo(args.devices, args.seed));
    let mut tracker = Tracker::new(Arc::clone(&backend), config)?;
    info!(devices = args.devices, seed = args.seed, "simulated backend ready");

    let mut ticker = interval(Duration::from_secs(args.interval_secs.max(1)));
    for cycle in 1..=args.cycles {
        ticker.tick().await;
        let summary = tracker.poll_cycle().await?;
        info!(
            cycle,
            devices = summary.devices,
            appended = summary.outcome.appended,
            rejected = summary.rejected_records,
            "cycle complete"
        );

        if let Some(device) = tracker.devices().first() {
            if let Some(projection) = tracker.detail_overlay(&device.id) {
                info!(
                    device = %device.id,
                    primitives = projection.primitives.len(),
                    x_min = projection.viewport.x_min,
                    x_max = projection.viewport.x_max,
                    "detail overlay framed"
                );
            }
        }

        // Halfway through, demonstrate a manual relocation
        if cycle == args.cycles / 2 {
            if let Some(id) = tracker.devices().first().map(|d| d.id.clone()) {
                tracker.update_device_position(&id, 10.0, 10.0).await?;
                info!(device = %id, "manually relocated to (10, 10)");
            }
        }
    }

    for device in tracker.devices() {
        let history = tracker.history_for(&device.id);
        let logs = tracker.device_rssi_logs(&device.id).await?;
        let samples: usize = logs.values().map(Vec::len).sum();
        info!(
            device = %device.id,
            kind = %device.kind,
            path_points = history.len(),
            rssi_samples = samples,
            "final state"
        );
    }

    Ok(())
}
