// ABOUTME: Runs the export workflow over a worklist of tables
// ABOUTME: Isolates per-table failures, records them, and summarizes the run

use super::failure_log::FailureLog;
use super::workflow::{run_table, WorkflowObserver, WorkflowResult};
use crate::session::WarehouseSession;
use crate::table_ref::TableRef;
use crate::unload::IntegrationNaming;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Conventional exit status for a process ended by SIGINT
const EXIT_INTERRUPTED: i32 = 130;

/// Request to stop a batch between tables
///
/// A statement that has already started always runs to completion; the flag
/// only prevents the next table from starting.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Set the flag on the first Ctrl-C and exit with status 130 on the second
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_ctrl_c_handler(&self) {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        tokio::spawn(
            self.clone()
                .watch_interrupts(rx, || std::process::exit(EXIT_INTERRUPTED)),
        );
    }

    /// Stop on the first interrupt, call `abort` on the second
    async fn watch_interrupts<A>(self, mut interrupts: mpsc::UnboundedReceiver<()>, abort: A)
    where
        A: FnOnce(),
    {
        if interrupts.recv().await.is_none() {
            return;
        }
        tracing::warn!(
            "⚠ Stop requested; finishing the current table. Press Ctrl-C again to abort immediately"
        );
        self.request_stop();

        if interrupts.recv().await.is_some() {
            tracing::error!("✗ Aborted by second Ctrl-C");
            abort();
        }
    }
}

/// Counts and failures of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Tables never started because a stop was requested
    pub skipped: usize,
    pub failures: Vec<WorkflowResult>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn failed_tables(&self) -> Vec<&TableRef> {
        self.failures.iter().map(|r| &r.table_ref).collect()
    }
}

/// Options shared by every table of a batch
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub naming: IntegrationNaming,
    pub stop: StopSignal,
}

/// Export every table in `tables`, in order, on one session
///
/// `base_path_fn` maps each table to its storage prefix (the table's
/// sanitized name is appended by the unload plan). A failing table is
/// appended to `failure_log` and the batch moves on to the next table; one
/// failure never aborts the batch.
pub async fn run_all<S, F>(
    session: &mut S,
    tables: &[TableRef],
    base_path_fn: F,
    failure_log: &FailureLog,
    options: &BatchOptions,
    observer: &mut dyn WorkflowObserver,
) -> BatchSummary
where
    S: WarehouseSession + ?Sized,
    F: Fn(&TableRef) -> String,
{
    let mut summary = BatchSummary::default();

    for (idx, table) in tables.iter().enumerate() {
        if options.stop.is_requested() {
            summary.skipped = tables.len() - idx;
            tracing::warn!(
                "⚠ Stopped before {}; {} table(s) not started",
                table,
                summary.skipped
            );
            break;
        }

        tracing::info!("Exporting {}/{}: {}", idx + 1, tables.len(), table);
        let base_path = base_path_fn(table);
        let result = run_table(session, table, &base_path, &options.naming, observer).await;
        summary.attempted += 1;

        if result.succeeded {
            summary.succeeded += 1;
            tracing::info!("  ✓ {} exported to {}/{}/", table, base_path, table.sanitized_table());
        } else {
            summary.failed += 1;
            let error = result.error.as_deref().unwrap_or("unknown error");
            tracing::error!("  ✗ Error processing {}: {}", table, error);

            if let Err(e) = failure_log.append(table, error) {
                tracing::error!("  ✗ Could not record failure for {}: {:#}", table, e);
            }
            summary.failures.push(result);
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::workflow::NoopObserver;
    use crate::session::QueryResult;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct FailingCopySession {
        fail_table: &'static str,
        copies: usize,
    }

    #[async_trait]
    impl WarehouseSession for FailingCopySession {
        async fn execute(&mut self, sql: &str) -> Result<QueryResult> {
            if sql.contains("INFORMATION_SCHEMA.COLUMNS") {
                return Ok(QueryResult::new(
                    vec!["SELECT_CLAUSE".into()],
                    vec![vec![Some("id".into())]],
                ));
            }
            if sql.starts_with("COPY INTO") {
                self.copies += 1;
                if sql.contains(self.fail_table) {
                    bail!("Insufficient privileges to operate on integration");
                }
            }
            Ok(QueryResult::default())
        }
    }

    #[tokio::test]
    async fn test_stop_before_first_table_skips_everything() {
        let dir = tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("failed.txt"));
        let options = BatchOptions::default();
        options.stop.request_stop();

        let mut session = FailingCopySession {
            fail_table: "none",
            copies: 0,
        };
        let tables = vec![TableRef::new("D", "S", "A"), TableRef::new("D", "S", "B")];

        let summary = run_all(
            &mut session,
            &tables,
            |_| "gcs://b/s".to_string(),
            &log,
            &options,
            &mut NoopObserver,
        )
        .await;

        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.skipped, 2);
        assert!(!summary.is_success());
        assert_eq!(session.copies, 0);
    }

    #[tokio::test]
    async fn test_base_path_fn_is_used_per_table() {
        let dir = tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("failed.txt"));
        let mut session = FailingCopySession {
            fail_table: "gcs://b/other/",
            copies: 0,
        };
        let tables = vec![
            TableRef::new("D", "S", "A"),
            TableRef::new("D", "OTHER", "B"),
        ];

        let summary = run_all(
            &mut session,
            &tables,
            |t| format!("gcs://b/{}", t.sanitized_schema()),
            &log,
            &BatchOptions::default(),
            &mut NoopObserver,
        )
        .await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_tables(), vec![&TableRef::new("D", "OTHER", "B")]);
        assert_eq!(session.copies, 2);
    }

    async fn wait_for_stop(stop: &StopSignal) {
        for _ in 0..100 {
            if stop.is_requested() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_second_interrupt_aborts() {
        let stop = StopSignal::new();
        let aborted = Arc::new(AtomicBool::new(false));
        let flag = aborted.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = tokio::spawn(
            stop.clone()
                .watch_interrupts(rx, move || flag.store(true, Ordering::SeqCst)),
        );

        tx.send(()).unwrap();
        wait_for_stop(&stop).await;
        assert!(stop.is_requested());
        assert!(!aborted.load(Ordering::SeqCst));

        tx.send(()).unwrap();
        watcher.await.unwrap();
        assert!(aborted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_single_interrupt_only_stops() {
        let stop = StopSignal::new();
        let aborted = Arc::new(AtomicBool::new(false));
        let flag = aborted.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(()).unwrap();
        drop(tx);
        stop.clone()
            .watch_interrupts(rx, move || flag.store(true, Ordering::SeqCst))
            .await;

        assert!(stop.is_requested());
        assert!(!aborted.load(Ordering::SeqCst));
    }
}
