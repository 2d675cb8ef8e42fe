// ABOUTME: Interactive terminal UI for warehouse, database, schema, and view selection
// ABOUTME: Builds the export worklist from the operator's choices

use crate::session::WarehouseSession;
use crate::snowflake::catalog;
use crate::table_ref::TableRef;
use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, MultiSelect, Select};

/// Views chosen interactively plus the warehouse they will run on
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub warehouse: Option<String>,
    pub tables: Vec<TableRef>,
}

/// Interactive view selection
///
/// Presents a terminal UI for selecting:
/// 1. A warehouse to run on (optional; keeps the session default when skipped)
/// 2. One database
/// 3. One schema of that database
/// 4. Views of that schema (multi-select)
/// 5. Summary and confirmation
///
/// Returns an empty [`Selection`] when nothing is available or nothing was
/// selected.
///
/// # Errors
///
/// Returns an error if catalog listing fails, the terminal cannot be used,
/// or the operator declines the confirmation.
pub async fn select_views<S>(session: &mut S) -> Result<Selection>
where
    S: WarehouseSession + ?Sized,
{
    tracing::info!("Starting interactive view selection...");
    tracing::info!("");

    let theme = ColorfulTheme::default();
    let mut selection = Selection::default();

    // Step 1: Warehouse
    let warehouses = catalog::list_warehouses(session).await?;
    if !warehouses.is_empty() {
        let mut items = vec!["(keep session default)".to_string()];
        items.extend(warehouses.iter().cloned());

        let choice = Select::with_theme(&theme)
            .with_prompt("Select warehouse")
            .items(&items)
            .default(0)
            .interact()
            .context("Failed to get warehouse selection")?;

        if choice > 0 {
            let warehouse = warehouses[choice - 1].clone();
            catalog::use_warehouse(session, &warehouse).await?;
            tracing::info!("✓ Using warehouse: {}", warehouse);
            selection.warehouse = Some(warehouse);
        }
    }

    // Step 2: Database
    let databases = catalog::list_databases(session).await?;
    if databases.is_empty() {
        tracing::warn!("⚠ No databases visible to the current role");
        return Ok(selection);
    }
    tracing::info!("✓ Found {} database(s)", databases.len());

    let db_idx = Select::with_theme(&theme)
        .with_prompt("Select database")
        .items(&databases)
        .default(0)
        .interact()
        .context("Failed to get database selection")?;
    let database = databases[db_idx].clone();

    // Step 3: Schema
    let schemas = catalog::list_schemas(session, &database).await?;
    if schemas.is_empty() {
        tracing::warn!("⚠ No schemas found in database '{}'", database);
        return Ok(selection);
    }
    tracing::info!("✓ Loaded {} schema(s)", schemas.len());

    let schema_idx = Select::with_theme(&theme)
        .with_prompt("Select schema")
        .items(&schemas)
        .default(0)
        .interact()
        .context("Failed to get schema selection")?;
    let schema = schemas[schema_idx].clone();

    // Step 4: Views
    let views = catalog::list_views(session, &database, &schema).await?;
    if views.is_empty() {
        tracing::warn!("⚠ No views found in {}.{}", database, schema);
        return Ok(selection);
    }
    tracing::info!("✓ Loaded {} view(s)", views.len());

    println!("Select views to export:");
    println!("(Use arrow keys to navigate, Space to select, Enter to confirm)");
    println!();

    let view_selections = MultiSelect::with_theme(&theme)
        .items(&views)
        .interact()
        .context("Failed to get view selection")?;

    if view_selections.is_empty() {
        tracing::warn!("⚠ No views selected");
        tracing::info!("  Cancelling interactive selection");
        return Ok(selection);
    }

    selection.tables = view_selections
        .iter()
        .map(|&idx| TableRef::new(database.clone(), schema.clone(), views[idx].clone()))
        .collect();

    // Step 5: Summary and confirm
    println!();
    println!("========================================");
    println!("Export Summary");
    println!("========================================");
    println!();
    println!("Database: {}", database);
    println!("Schema:   {}", schema);
    println!(
        "Warehouse: {}",
        selection.warehouse.as_deref().unwrap_or("(session default)")
    );
    println!("Views: {} selected", selection.tables.len());
    for table in &selection.tables {
        println!("  ✓ {}", table.table());
    }
    println!();
    println!("========================================");
    println!();

    let confirmed = Confirm::with_theme(&theme)
        .with_prompt("Proceed with this selection?")
        .default(true)
        .interact()
        .context("Failed to get confirmation")?;

    if !confirmed {
        tracing::warn!("⚠ User cancelled operation");
        bail!("Interactive selection cancelled by user");
    }

    tracing::info!("✓ Selection confirmed");
    tracing::info!("");

    Ok(selection)
}
