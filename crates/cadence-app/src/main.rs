use std::time::Duration;

use cadence_core::config::load_config;
use cadence_recurrence::GeneratorLimits;
use cadence_store::MemoryStore;
use cadence_worker::{run_retention_cleanup, run_worker};
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Cadence materialization worker");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let store = MemoryStore::new();
    let limits = GeneratorLimits {
        max_iterations: config.generator.max_iterations_per_series,
    };

    let mut materialization_tick = tokio::time::interval(Duration::from_secs(
        config.scheduler.materialization_interval_secs,
    ));
    materialization_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cleanup_tick =
        tokio::time::interval(Duration::from_secs(config.scheduler.cleanup_interval_secs));
    cleanup_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // An interval fires immediately on its first tick; consuming those here
    // defers the first runs by one full period when startup runs are off.
    if !config.scheduler.run_on_startup {
        materialization_tick.tick().await;
        cleanup_tick.tick().await;
    }

    tracing::info!(
        materialization_interval_secs = config.scheduler.materialization_interval_secs,
        cleanup_interval_secs = config.scheduler.cleanup_interval_secs,
        "Scheduler started"
    );

    loop {
        tokio::select! {
            _ = materialization_tick.tick() => {
                run_worker(&store, &config.worker, limits).await;
            }
            _ = cleanup_tick.tick() => {
                run_retention_cleanup(&store, Utc::now()).await;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!(error = %e, "Failed to listen for shutdown signal");
                }
                tracing::info!("Shutdown signal received, stopping scheduler");
                break;
            }
        }
    }

    Ok(())
}
