//! Retention sweeper for finished builds.
//!
//! Jobs otherwise live for the whole process. When a retention window is
//! configured, terminal jobs older than the window are dropped periodically.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::services::JobStore;

/// Configuration for the retention sweeper.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// How long finished builds are kept, in hours.
    pub retention_hours: u64,
    /// How often to sweep, in seconds.
    pub interval_secs: u64,
}

/// Start the retention background task.
///
/// Returns `None` (and spawns nothing) when `retention_hours` is zero.
pub fn start_retention_task(store: JobStore, config: RetentionConfig) -> Option<JoinHandle<()>> {
    if config.retention_hours == 0 {
        return None;
    }

    Some(tokio::spawn(async move {
        info!(
            "Starting build retention sweeper (retention: {} hours, interval: {} seconds)",
            config.retention_hours, config.interval_secs
        );

        let mut ticker = interval(Duration::from_secs(config.interval_secs.max(1)));

        loop {
            ticker.tick().await;
            run_sweep(&store, &config);
        }
    }))
}

/// Run a single sweep. Returns the number of evicted builds.
pub fn run_sweep(store: &JobStore, config: &RetentionConfig) -> usize {
    let Some(cutoff) = i64::try_from(config.retention_hours)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .and_then(|window| Utc::now().checked_sub_signed(window))
    else {
        debug!("Retention window reaches past the calendar, nothing to evict");
        return 0;
    };
    let evicted = store.evict_terminal_before(cutoff);

    if evicted > 0 {
        info!("Evicted {} finished builds older than {}", evicted, cutoff);
    } else {
        debug!("Retention sweep found nothing to evict");
    }

    evicted
}
