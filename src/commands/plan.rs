// ABOUTME: Plan command: print the unload script for each table without running it
// ABOUTME: Still queries column metadata so the script matches what export would execute

use crate::config::SnowflakeCredentials;
use crate::export::{gcs_base_path, prepare_plan};
use crate::session::WarehouseSession;
use crate::snowflake;
use crate::table_ref::TableRef;
use crate::unload::IntegrationNaming;
use anyhow::{Context, Result};

use super::Worklist;

/// Print the statements `export` would run for every worklist table
///
/// Tables whose metadata lookup fails are reported inline as SQL comments and
/// do not stop the remaining tables.
pub async fn plan(credentials: &SnowflakeCredentials, worklist: &Worklist) -> Result<()> {
    let bucket = worklist.require_bucket()?;

    let mut session = snowflake::connect(credentials)
        .await
        .context("Failed to connect to Snowflake")?;

    let script = render_script(&mut session, bucket, &worklist.tables).await;

    if let Err(e) = session.close().await {
        tracing::warn!("⚠ Failed to close Snowflake session: {:#}", e);
    }

    print!("{}", script);
    Ok(())
}

async fn render_script<S>(session: &mut S, bucket: &str, tables: &[TableRef]) -> String
where
    S: WarehouseSession + ?Sized,
{
    let naming = IntegrationNaming::Deterministic;
    let rule = "-- =============================================\n";

    let mut out = String::new();
    out.push_str(rule);
    out.push_str("-- Snowflake unload script\n");
    out.push_str(&format!("-- Tables: {}\n", tables.len()));
    out.push_str(rule);

    for table in tables {
        out.push_str(&format!("\n-- Workflow for {}\n", table));
        let base_path = gcs_base_path(bucket, table);
        match prepare_plan(session, table, &base_path, &naming).await {
            Ok(plan) => {
                for statement in plan.statements() {
                    out.push_str(statement);
                    out.push('\n');
                }
            }
            Err(e) => {
                tracing::error!("✗ Could not plan {}: {:#}", table, e);
                let reason = format!("{:#}", e).replace('\n', " ");
                out.push_str(&format!("-- Skipped: {}\n", reason));
            }
        }
    }

    out
}
