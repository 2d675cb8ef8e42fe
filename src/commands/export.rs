// ABOUTME: Export command: unload every worklist table to GCS, then optionally load BigQuery
// ABOUTME: Shows progress, records failures, and prints the run summary

use crate::bigquery::{self, BigQueryClient};
use crate::config::{BigQueryConfig, SnowflakeCredentials};
use crate::export::{
    gcs_base_path, run_all, BatchOptions, BatchSummary, FailureLog, StopSignal, WorkflowObserver,
    WorkflowResult, WorkflowStep,
};
use crate::session::WarehouseSession;
use crate::table_ref::TableRef;
use crate::unload::IntegrationNaming;
use crate::{interactive, snowflake};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use super::Worklist;

/// Settings for one export run
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub worklist: Worklist,
    pub interactive: bool,
    pub failure_log: FailureLog,
    /// Suffix integration names with a per-run token
    pub unique_integrations: bool,
    /// Load into BigQuery after a fully successful export
    pub bigquery: Option<BigQueryConfig>,
}

/// Progress bar advanced once per finished table
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        Self { bar }
    }
}

impl WorkflowObserver for ProgressObserver {
    fn on_step(&mut self, table: &TableRef, step: &WorkflowStep) {
        let message = match step {
            WorkflowStep::FetchingColumns => format!("{}: fetching columns", table.table()),
            WorkflowStep::Planned { statements } => {
                format!("{}: generated {} statements", table.table(), statements)
            }
            WorkflowStep::Executing { index, total } => {
                format!("{}: statement {}/{}", table.table(), index, total)
            }
            WorkflowStep::Executed { index, summary } => {
                tracing::debug!("Statement {} result for {}: {}", index, table, summary);
                return;
            }
        };
        self.bar.set_message(message);
    }

    fn on_finished(&mut self, result: &WorkflowResult) {
        self.bar.inc(1);
        let mark = if result.succeeded { "✓" } else { "✗" };
        self.bar
            .set_message(format!("{} {}", mark, result.table_ref.table()));
    }
}

/// Export the worklist to GCS
///
/// Steps:
/// 1. Connect to Snowflake (a failure here aborts the run)
/// 2. Resolve the worklist, interactively if requested
/// 3. Run the unload workflow per table; failures are logged and skipped
/// 4. Print the summary
/// 5. Load into BigQuery when configured and every table succeeded
///
/// Ctrl-C stops the run after the current table; a second Ctrl-C exits.
///
/// # Errors
///
/// Returns an error if the connection fails, no bucket is configured, or the
/// interactive selection is cancelled. Per-table failures are reported in the
/// returned [`BatchSummary`], not as an error.
pub async fn export(credentials: &SnowflakeCredentials, options: ExportOptions) -> Result<BatchSummary> {
    let bucket = options.worklist.require_bucket()?.to_string();

    tracing::info!("Connecting to Snowflake...");
    let mut session = snowflake::connect(credentials)
        .await
        .context("Failed to connect to Snowflake")?;
    tracing::info!("✓ Connected to Snowflake");

    let result = run_export(&mut session, &bucket, &options).await;

    if let Err(e) = session.close().await {
        tracing::warn!("⚠ Failed to close Snowflake session: {:#}", e);
    }

    result
}

async fn run_export<S>(session: &mut S, bucket: &str, options: &ExportOptions) -> Result<BatchSummary>
where
    S: WarehouseSession + ?Sized,
{
    let mut tables = options.worklist.tables.clone();
    if options.interactive {
        let selection = interactive::select_views(session).await?;
        tables = selection.tables;
    }

    if tables.is_empty() {
        tracing::warn!("⚠ No tables to export");
        return Ok(BatchSummary::default());
    }

    let naming = if options.unique_integrations {
        IntegrationNaming::run_scoped()
    } else {
        IntegrationNaming::Deterministic
    };

    tracing::info!(
        "Starting export of {} table(s) to gs://{} (failures are logged to {})",
        tables.len(),
        bucket,
        options.failure_log.path().display()
    );
    tracing::info!("Press Ctrl-C to stop after the current table, twice to abort");
    tracing::info!("");

    let stop = StopSignal::new();
    stop.install_ctrl_c_handler();
    let batch_options = BatchOptions { naming, stop };

    let mut observer = ProgressObserver::new(tables.len());
    let summary = run_all(
        session,
        &tables,
        |table| gcs_base_path(bucket, table),
        &options.failure_log,
        &batch_options,
        &mut observer,
    )
    .await;
    observer.bar.finish_with_message("Export complete");

    print_summary(&summary, tables.len(), options.failure_log.path());

    if let Some(ref bq) = options.bigquery {
        if summary.is_success() {
            run_bigquery_load(bq, bucket, &tables).await;
        } else {
            tracing::warn!("⚠ Skipping BigQuery import due to failed or skipped exports");
        }
    }

    Ok(summary)
}

fn print_summary(summary: &BatchSummary, total: usize, failure_log: &std::path::Path) {
    println!();
    println!("============================================================================");
    println!(
        "Completed processing {} tables, succeeded: {}, failed: {}",
        total, summary.succeeded, summary.failed
    );
    if summary.skipped > 0 {
        println!("Not started (stopped): {}", summary.skipped);
    }
    if !summary.failures.is_empty() {
        println!();
        println!("Failed tables (recorded in {}):", failure_log.display());
        for failure in &summary.failures {
            println!(
                "  ✗ {}: {}",
                failure.table_ref,
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!("============================================================================");
    println!();
}

/// Load failures are reported only; exported files stay in place
async fn run_bigquery_load(config: &BigQueryConfig, bucket: &str, tables: &[TableRef]) {
    tracing::info!("Starting BigQuery import into project {}", config.project);

    let client = match BigQueryClient::new(&config.project, config.location.as_deref()).await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("✗ BigQuery import failed: {:#}", e);
            return;
        }
    };

    let summary = bigquery::load_views(&client, bucket, tables).await;
    if summary.is_success() {
        tracing::info!("✅ Imported {} table(s) to BigQuery", summary.loaded);
    } else {
        tracing::error!(
            "✗ BigQuery import: {} loaded, {} failed",
            summary.loaded,
            summary.failures.len()
        );
    }
}
