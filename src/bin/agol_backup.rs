//! Back up the configured ArcGIS Online items into a timestamped GeoPackage.
//!
//! Configuration comes from `AGOL_*` environment variables; see [`Config`].

use agol_gpkg::{Config, ITEMS, PortalClient, run_backup};
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid AGOL_LOG filter '{}'", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // One timestamp names the file for the whole run.
    let path = config.output_path(chrono::Local::now().naive_local());

    let client = PortalClient::sign_in(&config.portal)
        .with_context(|| format!("signing in to {}", config.portal.url))?;
    let report = run_backup(&client, ITEMS, &path)
        .with_context(|| format!("backing up to {}", path.display()))?;

    info!(
        layers = report.layers.len(),
        tables = report.tables.len(),
        path = %report.path.display(),
        "Process complete."
    );
    Ok(())
}
