//! Daemon trigger loop
//!
//! Runs one full reconciliation pass immediately at startup, then one pass
//! per firing of the schedule, indefinitely, until a shutdown signal
//! arrives. Passes run inline in the loop and the delay to the next firing
//! is computed after a pass completes, so two passes from the same process
//! can never overlap.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{Config, ScheduleConfig};
use crate::sync::SyncEngine;

/// Daemon state and control
pub struct Daemon {
    config: Arc<Config>,
    engine: SyncEngine,
    shutdown_sender: broadcast::Sender<()>,
}

impl Daemon {
    /// Create a new daemon instance.
    ///
    /// A malformed schedule is rejected here, before any pass runs.
    pub fn new(config: Config) -> Result<Self> {
        describe_schedule(&config.schedule)?;

        let engine =
            SyncEngine::new(config.clone()).context("Failed to create sync engine for daemon")?;

        let (shutdown_sender, _) = broadcast::channel(1);

        Ok(Self {
            config: Arc::new(config),
            engine,
            shutdown_sender,
        })
    }

    /// Run the daemon in the foreground until a shutdown signal arrives
    pub async fn run(&self) -> Result<()> {
        info!("Starting MirrorKeep daemon");

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let shutdown_sender = self.shutdown_sender.clone();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, stopping daemon...");
                let _ = shutdown_sender.send(());
            }
        });

        // One full pass immediately at startup
        self.run_pass().await;

        loop {
            let delay = next_firing_delay(&self.config.schedule)?;
            debug!("Next reconciliation pass in {:?}", delay);

            tokio::select! {
                _ = shutdown_receiver.recv() => {
                    info!("Daemon loop exiting");
                    break;
                }

                _ = tokio::time::sleep(delay) => {
                    self.run_pass().await;
                }
            }
        }

        Ok(())
    }

    async fn run_pass(&self) {
        let summary = self.engine.run_all().await;

        if summary.has_failures() {
            warn!(
                "Pass finished with failures: {} repository failures, {} accounts skipped",
                summary.failed,
                summary.listing_failures.len()
            );
        }
    }
}

/// Validate the configured schedule and describe its cadence.
///
/// Used both as the startup gate in `Daemon::new` and by the health checks,
/// so a bad interval expression surfaces before the first pass instead of
/// after it.
pub fn describe_schedule(schedule: &ScheduleConfig) -> Result<String> {
    match &schedule.interval {
        Some(expr) => {
            parse_interval(expr)
                .with_context(|| format!("Invalid schedule interval {:?}", expr))?;
            Ok(format!("every {}", expr.trim()))
        }
        None => Ok("daily at local midnight".to_string()),
    }
}

/// Delay until the next scheduled firing.
///
/// An explicit interval expression takes precedence; the default cadence is
/// once per day at local midnight.
fn next_firing_delay(schedule: &ScheduleConfig) -> Result<Duration> {
    match &schedule.interval {
        Some(expr) => {
            let seconds = parse_interval(expr)
                .with_context(|| format!("Invalid schedule interval {:?}", expr))?;
            Ok(Duration::from_secs(seconds))
        }
        None => duration_until_next_midnight(Local::now().naive_local()),
    }
}

/// Parse interval expressions like "30m", "6h", "1d" into seconds
fn parse_interval(duration_str: &str) -> Result<u64> {
    let duration_str = duration_str.trim().to_lowercase();

    if let Some(value) = duration_str.strip_suffix('s') {
        value.parse::<u64>().context("Invalid seconds value")
    } else if let Some(value) = duration_str.strip_suffix('m') {
        value
            .parse::<u64>()
            .map(|v| v * 60)
            .context("Invalid minutes value")
    } else if let Some(value) = duration_str.strip_suffix('h') {
        value
            .parse::<u64>()
            .map(|v| v * 3600)
            .context("Invalid hours value")
    } else if let Some(value) = duration_str.strip_suffix('d') {
        value
            .parse::<u64>()
            .map(|v| v * 86400)
            .context("Invalid days value")
    } else {
        // Try to parse as raw seconds
        duration_str
            .parse::<u64>()
            .context("Invalid duration format. Use format like '30m', '6h', '1d'")
    }
}

fn duration_until_next_midnight(now: NaiveDateTime) -> Result<Duration> {
    let next_midnight = now
        .date()
        .succ_opt()
        .context("Failed to compute next calendar day")?
        .and_hms_opt(0, 0, 0)
        .context("Failed to compute next midnight")?;

    (next_midnight - now)
        .to_std()
        .context("Next midnight is not in the future")
}
