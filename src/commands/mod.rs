// ABOUTME: Command implementations for the CLI subcommands
// ABOUTME: Exports export, plan, list, and load plus shared worklist resolution

pub mod export;
pub mod list;
pub mod load;
pub mod plan;

pub use export::{export, ExportOptions};
pub use list::{list, ListTarget};
pub use load::load;
pub use plan::plan;

use crate::config::{load_export_config, BigQueryConfig};
use crate::export::FailureLog;
use crate::table_ref::TableRef;
use crate::utils::normalize_bucket;
use anyhow::{Context, Result};

/// Tables and destinations gathered from config, flags, and the failure log
#[derive(Debug, Clone, Default)]
pub struct Worklist {
    pub bucket: Option<String>,
    pub bigquery: Option<BigQueryConfig>,
    pub tables: Vec<TableRef>,
}

impl Worklist {
    /// The bucket, or an error explaining how to supply one
    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket.as_deref().context(
            "A GCS bucket is required.\n\
             Pass --bucket or set [gcs] bucket in the config file.",
        )
    }

    fn push_unique(&mut self, table: TableRef) {
        if !self.tables.contains(&table) {
            self.tables.push(table);
        }
    }
}

/// Where worklist entries come from
#[derive(Debug, Clone, Default)]
pub struct WorklistArgs {
    pub config_path: Option<String>,
    pub bucket: Option<String>,
    /// `database.schema.table` triples
    pub tables: Vec<String>,
    /// Re-run every table recorded in this failure log
    pub retry_from: Option<FailureLog>,
}

/// Merge config file, CLI flags, and failure log into one worklist
///
/// The CLI bucket overrides the config bucket. Tables keep their first-seen
/// order: config entries, then `--table` flags, then failure-log entries,
/// with duplicates dropped.
pub fn build_worklist(args: &WorklistArgs) -> Result<Worklist> {
    let mut worklist = Worklist::default();

    if let Some(ref path) = args.config_path {
        let config = load_export_config(path)?;
        worklist.bucket = Some(config.bucket);
        worklist.bigquery = config.bigquery;
        for table in config.tables {
            worklist.push_unique(table);
        }
    }

    if let Some(ref bucket) = args.bucket {
        worklist.bucket = Some(normalize_bucket(bucket)?);
    }

    for raw in &args.tables {
        let table: TableRef = raw.parse()?;
        worklist.push_unique(table);
    }

    if let Some(ref log) = args.retry_from {
        let failed = log.failed_tables()?;
        tracing::info!(
            "Retrying {} table(s) recorded in {}",
            failed.len(),
            log.path().display()
        );
        for table in failed {
            worklist.push_unique(table);
        }
    }

    Ok(worklist)
}
