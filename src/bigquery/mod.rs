// ABOUTME: Optional downstream load of exported Parquet files into BigQuery
// ABOUTME: Derives dataset/table names from sanitized identifiers and runs load jobs

pub mod client;

pub use client::{access_token, BigQueryClient};

use crate::table_ref::TableRef;

/// Dataset for a table: `<sanitized database>_<sanitized schema>`
pub fn dataset_id(table: &TableRef) -> String {
    format!("{}_{}", table.sanitized_database(), table.sanitized_schema())
}

/// Destination table identifier: `<dataset>.<sanitized view>`
///
/// # Examples
///
/// ```
/// # use snow2gcp::bigquery::destination_table;
/// # use snow2gcp::table_ref::TableRef;
/// let table = TableRef::new("D1", "S1", "My View!");
/// assert_eq!(destination_table(&table), "d1_s1.my_view_");
/// ```
pub fn destination_table(table: &TableRef) -> String {
    format!("{}.{}", dataset_id(table), table.sanitized_table())
}

/// Every Parquet file under the view's storage prefix
pub fn source_uri(bucket: &str, table: &TableRef) -> String {
    format!(
        "gs://{}/{}/{}/*.parquet",
        bucket,
        table.sanitized_schema(),
        table.sanitized_table()
    )
}

/// Counts and failures of a downstream load
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failures: Vec<(TableRef, String)>,
}

impl LoadSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Load each exported view into BigQuery with full-table overwrite
///
/// Each view is loaded independently; a failure is reported in the summary
/// and never touches data already unloaded to storage.
pub async fn load_views(client: &BigQueryClient, bucket: &str, tables: &[TableRef]) -> LoadSummary {
    let mut summary = LoadSummary::default();
    let mut ready_datasets: Vec<String> = Vec::new();

    for (idx, table) in tables.iter().enumerate() {
        let dataset = dataset_id(table);
        let destination = destination_table(table);
        let uri = source_uri(bucket, table);
        tracing::info!(
            "Loading {}/{}: {} -> {}.{}",
            idx + 1,
            tables.len(),
            uri,
            client.project(),
            destination
        );

        let result = async {
            if !ready_datasets.contains(&dataset) {
                client.ensure_dataset(&dataset).await?;
                ready_datasets.push(dataset.clone());
            }
            client
                .load_parquet(&uri, &dataset, &table.sanitized_table())
                .await
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!("  ✓ Loaded table {}", destination);
                summary.loaded += 1;
            }
            Err(e) => {
                tracing::error!("  ✗ BigQuery load failed for {}: {:#}", table, e);
                summary.failures.push((table.clone(), format!("{:#}", e)));
            }
        }
    }

    summary
}
