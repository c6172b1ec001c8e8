mod wander;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stagebridge_core::{BridgeConfig, CycleDriver, CycleStats, StageDriver, World};

use wander::Wander;

/// Serve simulated devices from a world description.
#[derive(Parser, Debug)]
#[command(name = "stagebridge", version, about, long_about = None)]
struct Args {
    /// Path to the bridge configuration (JSON)
    #[arg(short, long, default_value = "worlds/simple.json")]
    config: PathBuf,

    /// Leave every device unsubscribed at startup
    #[arg(long)]
    no_subscribe: bool,

    /// Drive each position device with a simple obstacle-avoiding client
    #[arg(long)]
    wander: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stagebridge=info")),
        )
        .init();

    let args = Args::parse();
    info!("stagebridge v{}", env!("CARGO_PKG_VERSION"));

    let config = BridgeConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let world = Arc::new(World::from_description(&config.world)?);
    let stats = Arc::new(CycleStats::new()?);

    let mut drivers = Vec::with_capacity(config.drivers.len());
    for (n, block) in config.drivers.iter().enumerate() {
        let declarations = block.declarations()?;
        let mut driver =
            StageDriver::setup_with(Arc::clone(&world), &declarations, block.resolve_policy)
                .with_context(|| format!("driver block {} ({:?})", n, block.provides))?
                .with_stats(Arc::clone(&stats));
        if !args.no_subscribe {
            for decl in &declarations {
                driver.subscribe(decl.device)?;
            }
        }
        drivers.push(driver);
    }

    let mut clients: Vec<Wander> = if args.wander {
        drivers.iter().filter_map(Wander::attach).collect()
    } else {
        Vec::new()
    };

    let cycle = CycleDriver::new(Arc::clone(&world))
        .with_stats(Arc::clone(&stats))
        .spawn()?;

    let interval = Duration::from_millis(config.dispatch_interval_ms);
    let mut passes: u64 = 0;
    while !cycle.is_finished() {
        let started = Instant::now();
        for client in &mut clients {
            client.step();
        }
        for driver in &mut drivers {
            let report = driver.update();
            for (device, error) in &report.failures {
                warn!(%device, code = error.code(), "device skipped this cycle");
            }
        }

        passes += 1;
        if config.stats_report_interval > 0 && passes % config.stats_report_interval == 0 {
            let summary = stats.summary();
            info!(
                sim_time_ms = world.sim_time_ms(),
                ticks = summary.ticks,
                tick_p99_us = summary.tick_p99_us,
                dispatch_p50_us = summary.dispatch_p50_us,
                dispatch_p99_us = summary.dispatch_p99_us,
                "cycle stats"
            );
            stats.reset();
        }

        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    for driver in &mut drivers {
        driver.shutdown();
    }
    cycle.join().map_err(|_| anyhow!("cycle driver thread panicked"))?;
    info!(passes, "simulation finished");
    Ok(())
}
