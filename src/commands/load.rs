// ABOUTME: Load command: import already-exported Parquet files into BigQuery
// ABOUTME: Runs without a Snowflake session; each view loads independently

use crate::bigquery::{self, BigQueryClient};
use crate::config::BigQueryConfig;
use anyhow::{bail, Context, Result};

use super::Worklist;

/// Load every worklist table from GCS into BigQuery
///
/// # Errors
///
/// Returns an error when no bucket or BigQuery project is configured, when no
/// access token is available, or when any view fails to load.
pub async fn load(worklist: &Worklist, bigquery: Option<BigQueryConfig>) -> Result<()> {
    let bucket = worklist.require_bucket()?;
    let config = bigquery.or_else(|| worklist.bigquery.clone()).context(
        "A BigQuery project is required.\n\
         Pass --bigquery-project or set [bigquery] project in the config file.",
    )?;

    if worklist.tables.is_empty() {
        tracing::warn!("⚠ No tables to load");
        return Ok(());
    }

    let client = BigQueryClient::new(&config.project, config.location.as_deref()).await?;
    let summary = bigquery::load_views(&client, bucket, &worklist.tables).await;

    println!();
    println!(
        "Loaded {} of {} tables into BigQuery project {}",
        summary.loaded,
        worklist.tables.len(),
        config.project
    );
    for (table, error) in &summary.failures {
        println!("  ✗ {}: {}", table, error);
    }

    if !summary.is_success() {
        bail!("{} table(s) failed to load", summary.failures.len());
    }
    Ok(())
}
