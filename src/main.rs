// Job harvest binary
//
// Usage: job-harvest [config.json]
// Without an argument the config is read from JOB_HARVEST_CONFIG, or defaults.

use anyhow::{Context, Result};
use job_harvest::{HarvestConfig, logging};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => HarvestConfig::from_json_file(&path)
            .with_context(|| format!("loading config {}", path.to_string_lossy()))?,
        None => HarvestConfig::from_env().context("loading config")?,
    };

    let summary = job_harvest::harvest(&config).await?;

    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(report) => println!("{report}"),
            Err(e) => println!("{}: failed: {e}", outcome.site),
        }
    }
    println!(
        "total: {} stored, {} duplicates",
        summary.stored(),
        summary.duplicates()
    );

    if summary.reports().next().is_none() && !summary.outcomes.is_empty() {
        anyhow::bail!("every site failed");
    }
    Ok(())
}
