// ABOUTME: List command: browse warehouses, databases, schemas, and views
// ABOUTME: Helps build config files and --table arguments without a SQL client

use crate::config::SnowflakeCredentials;
use crate::session::WarehouseSession;
use crate::snowflake::{self, catalog};
use anyhow::{Context, Result};

/// What to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListTarget {
    Warehouses,
    Databases,
    Schemas { database: String },
    Views { database: String, schema: String },
}

impl ListTarget {
    /// Pick the narrowest listing the given scope allows
    pub fn from_scope(database: Option<String>, schema: Option<String>, warehouses: bool) -> Self {
        match (warehouses, database, schema) {
            (true, _, _) => Self::Warehouses,
            (false, Some(database), Some(schema)) => Self::Views { database, schema },
            (false, Some(database), None) => Self::Schemas { database },
            (false, None, _) => Self::Databases,
        }
    }
}

/// Print one name per line for `target`
pub async fn list(credentials: &SnowflakeCredentials, target: ListTarget) -> Result<()> {
    let mut session = snowflake::connect(credentials)
        .await
        .context("Failed to connect to Snowflake")?;

    let result = fetch_names(&mut session, &target).await;

    if let Err(e) = session.close().await {
        tracing::warn!("⚠ Failed to close Snowflake session: {:#}", e);
    }

    let names = result?;
    if names.is_empty() {
        tracing::warn!("⚠ Nothing found");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

async fn fetch_names<S>(session: &mut S, target: &ListTarget) -> Result<Vec<String>>
where
    S: WarehouseSession + ?Sized,
{
    match target {
        ListTarget::Warehouses => catalog::list_warehouses(session).await,
        ListTarget::Databases => catalog::list_databases(session).await,
        ListTarget::Schemas { database } => catalog::list_schemas(session, database).await,
        ListTarget::Views { database, schema } => {
            catalog::list_views(session, database, schema).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_scope() {
        assert_eq!(ListTarget::from_scope(None, None, false), ListTarget::Databases);
        assert_eq!(
            ListTarget::from_scope(Some("D".into()), None, false),
            ListTarget::Schemas {
                database: "D".into()
            }
        );
        assert_eq!(
            ListTarget::from_scope(Some("D".into()), Some("S".into()), false),
            ListTarget::Views {
                database: "D".into(),
                schema: "S".into()
            }
        );
        assert_eq!(
            ListTarget::from_scope(Some("D".into()), None, true),
            ListTarget::Warehouses
        );
        // A schema without a database is not enough to list views
        assert_eq!(
            ListTarget::from_scope(None, Some("S".into()), false),
            ListTarget::Databases
        );
    }
}
