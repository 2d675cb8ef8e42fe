// ABOUTME: Export orchestration: per-table workflow and batch runner
// ABOUTME: Re-exports the types commands and tests work with

pub mod batch;
pub mod failure_log;
pub mod workflow;

pub use batch::{run_all, BatchOptions, BatchSummary, StopSignal};
pub use failure_log::{FailureEntry, FailureLog, DEFAULT_FAILURE_LOG};
pub use workflow::{
    fetch_select_clause, prepare_plan, run_table, NoopObserver, WorkflowObserver, WorkflowResult,
    WorkflowStep,
};

/// Storage prefix for a table's schema: `gcs://<bucket>/<sanitized schema>`
pub fn gcs_base_path(bucket: &str, table: &crate::table_ref::TableRef) -> String {
    format!("gcs://{}/{}", bucket, table.sanitized_schema())
}
