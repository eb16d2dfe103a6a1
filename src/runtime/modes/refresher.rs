//! Refresher mode
//!
//! Runs the database refresher until Ctrl+C, or a single cycle with `--once`.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::get_config;
use crate::runtime::lifetime;
use crate::services::DatabaseRefresher;

pub async fn run_refresher(once: bool) -> Result<()> {
    let config = get_config();
    let refresher = DatabaseRefresher::from_config(&config);

    if config.refresh.license_key().is_some() {
        info!("MaxMind license key configured, database downloads enabled");
    } else {
        warn!("No MaxMind license key configured, only placeholder databases will be written");
    }
    info!(
        "Databases: {} and {}",
        config.geoip.city_db_path().display(),
        config.geoip.asn_db_path().display()
    );

    if once {
        let report = refresher
            .run_cycle()
            .await
            .context("database refresh cycle failed")?;

        for (edition, reason) in &report.failed {
            warn!("{} was not refreshed: {}", edition, reason);
        }
        info!(
            refreshed = ?report.refreshed,
            placeholders = ?report.placeholders,
            "Single refresh cycle finished"
        );
        return Ok(());
    }

    tokio::select! {
        _ = refresher.run_forever() => {}
        _ = lifetime::shutdown::wait_for_shutdown_signal() => {
            warn!("Database refresher stopped");
        }
    }

    Ok(())
}
