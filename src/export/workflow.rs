// ABOUTME: Per-table export workflow: metadata query, plan, ordered execution
// ABOUTME: Turns any failure into a WorkflowResult instead of aborting the caller

use crate::session::WarehouseSession;
use crate::table_ref::TableRef;
use crate::unload::{build_metadata_query, plan_for, IntegrationNaming, UnloadPlan};
use crate::utils::collapse_lines;
use anyhow::{bail, Context, Result};

/// Outcome of exporting one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowResult {
    pub table_ref: TableRef,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl WorkflowResult {
    pub fn success(table_ref: TableRef) -> Self {
        Self {
            table_ref,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(table_ref: TableRef, error: impl Into<String>) -> Self {
        Self {
            table_ref,
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// Progress points reported while a table is exported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStep {
    FetchingColumns,
    Planned { statements: usize },
    Executing { index: usize, total: usize },
    Executed { index: usize, summary: String },
}

/// Receives progress notifications from the workflow
///
/// Implementations drive progress bars or logs; they never influence the
/// workflow itself.
pub trait WorkflowObserver {
    fn on_step(&mut self, _table: &TableRef, _step: &WorkflowStep) {}

    fn on_finished(&mut self, _result: &WorkflowResult) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Run the metadata query for a table and return its single-line SELECT clause
///
/// # Errors
///
/// Returns an error if the query fails, if the result is not exactly one row
/// with one column, or if the clause is NULL or empty (no visible columns).
pub async fn fetch_select_clause<S>(session: &mut S, table: &TableRef) -> Result<String>
where
    S: WarehouseSession + ?Sized,
{
    let query = build_metadata_query(table.database(), table.schema(), table.table());
    tracing::debug!("Metadata query for {}:\n{}", table, query);

    let result = session
        .execute(&query)
        .await
        .context("Failed to fetch column information")?;

    let clause = result
        .single_value()
        .context("Unexpected metadata query result shape")?;

    match clause {
        Some(clause) if !clause.trim().is_empty() => Ok(collapse_lines(clause)),
        _ => bail!(
            "No columns found for {} (check that the table exists and is visible to the current role)",
            table
        ),
    }
}

/// Build the unload plan for a table from live column metadata
pub async fn prepare_plan<S>(
    session: &mut S,
    table: &TableRef,
    base_path: &str,
    naming: &IntegrationNaming,
) -> Result<UnloadPlan>
where
    S: WarehouseSession + ?Sized,
{
    let select_clause = fetch_select_clause(session, table).await?;
    Ok(plan_for(table, base_path, &select_clause, naming))
}

/// Export one table to `base_path/<sanitized table>/`
///
/// Steps:
/// 1. Run the metadata query and collapse the clause to a single line
/// 2. Build the unload plan
/// 3. Execute every statement in order on `session`
///
/// The first failing statement ends the workflow; later statements are not
/// run, including the cleanup. Errors are reported in the returned
/// [`WorkflowResult`], never propagated.
pub async fn run_table<S>(
    session: &mut S,
    table: &TableRef,
    base_path: &str,
    naming: &IntegrationNaming,
    observer: &mut dyn WorkflowObserver,
) -> WorkflowResult
where
    S: WarehouseSession + ?Sized,
{
    let result = match execute_workflow(session, table, base_path, naming, observer).await {
        Ok(()) => WorkflowResult::success(table.clone()),
        Err(e) => WorkflowResult::failure(table.clone(), format!("{:#}", e)),
    };
    observer.on_finished(&result);
    result
}

async fn execute_workflow<S>(
    session: &mut S,
    table: &TableRef,
    base_path: &str,
    naming: &IntegrationNaming,
    observer: &mut dyn WorkflowObserver,
) -> Result<()>
where
    S: WarehouseSession + ?Sized,
{
    observer.on_step(table, &WorkflowStep::FetchingColumns);
    let plan = prepare_plan(session, table, base_path, naming).await?;

    let total = plan.len();
    observer.on_step(table, &WorkflowStep::Planned { statements: total });
    tracing::debug!(
        "Generated {} unload statements for {} (integration: {}, location: {})",
        total,
        table,
        plan.integration_name(),
        plan.location()
    );

    for (idx, statement) in plan.statements().iter().enumerate() {
        let index = idx + 1;
        observer.on_step(table, &WorkflowStep::Executing { index, total });
        tracing::debug!("Executing statement {}/{} for {}:\n{}", index, total, table, statement);

        let result = session
            .execute(statement)
            .await
            .with_context(|| format!("Statement {}/{} failed", index, total))?;

        observer.on_step(
            table,
            &WorkflowStep::Executed {
                index,
                summary: result.summary(),
            },
        );
    }

    Ok(())
}
