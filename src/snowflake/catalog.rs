// ABOUTME: Catalog discovery for interactive selection
// ABOUTME: Lists warehouses, databases, schemas, and views through SHOW statements

use crate::session::WarehouseSession;
use anyhow::{Context, Result};

/// Schemas every database carries that never hold exportable views
const SYSTEM_SCHEMAS: &[&str] = &["INFORMATION_SCHEMA"];

async fn names<S>(session: &mut S, sql: &str) -> Result<Vec<String>>
where
    S: WarehouseSession + ?Sized,
{
    let result = session.execute(sql).await?;
    result.column_values("name")
}

/// Double embedded double quotes so a name can sit inside `"..."`
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// List warehouses visible to the current role
pub async fn list_warehouses<S>(session: &mut S) -> Result<Vec<String>>
where
    S: WarehouseSession + ?Sized,
{
    names(session, "SHOW WAREHOUSES")
        .await
        .context("Failed to list warehouses")
}

/// List databases visible to the current role
pub async fn list_databases<S>(session: &mut S) -> Result<Vec<String>>
where
    S: WarehouseSession + ?Sized,
{
    names(session, "SHOW DATABASES")
        .await
        .context("Failed to list databases")
}

/// List schemas of a database, without `INFORMATION_SCHEMA`
pub async fn list_schemas<S>(session: &mut S, database: &str) -> Result<Vec<String>>
where
    S: WarehouseSession + ?Sized,
{
    let sql = format!("SHOW SCHEMAS IN DATABASE {}", quote_ident(database));
    let schemas = names(session, &sql)
        .await
        .with_context(|| format!("Failed to list schemas in database '{}'", database))?;

    Ok(schemas
        .into_iter()
        .filter(|s| !SYSTEM_SCHEMAS.contains(&s.as_str()))
        .collect())
}

/// List views of a schema
pub async fn list_views<S>(session: &mut S, database: &str, schema: &str) -> Result<Vec<String>>
where
    S: WarehouseSession + ?Sized,
{
    let sql = format!(
        "SHOW VIEWS IN SCHEMA {}.{}",
        quote_ident(database),
        quote_ident(schema)
    );
    names(session, &sql)
        .await
        .with_context(|| format!("Failed to list views in {}.{}", database, schema))
}

/// Switch the session's current warehouse
pub async fn use_warehouse<S>(session: &mut S, warehouse: &str) -> Result<()>
where
    S: WarehouseSession + ?Sized,
{
    session
        .execute(&format!("USE WAREHOUSE {}", quote_ident(warehouse)))
        .await
        .with_context(|| format!("Failed to use warehouse '{}'", warehouse))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::QueryResult;
    use async_trait::async_trait;

    #[derive(Default)]
    struct ShowSession {
        statements: Vec<String>,
    }

    #[async_trait]
    impl WarehouseSession for ShowSession {
        async fn execute(&mut self, sql: &str) -> Result<QueryResult> {
            self.statements.push(sql.to_string());
            let names: &[&str] = if sql.starts_with("SHOW SCHEMAS") {
                &["INFORMATION_SCHEMA", "PUBLIC", "Mixed Case"]
            } else {
                &["A", "B"]
            };
            Ok(QueryResult::new(
                vec!["created_on".into(), "name".into()],
                names
                    .iter()
                    .map(|n| vec![Some("2024-01-01".into()), Some(n.to_string())])
                    .collect(),
            ))
        }
    }

    #[tokio::test]
    async fn test_list_schemas_drops_information_schema() {
        let mut session = ShowSession::default();
        let schemas = list_schemas(&mut session, "SALES").await.unwrap();
        assert_eq!(schemas, vec!["PUBLIC", "Mixed Case"]);
        assert_eq!(session.statements[0], "SHOW SCHEMAS IN DATABASE \"SALES\"");
    }

    #[tokio::test]
    async fn test_list_views_quotes_identifiers() {
        let mut session = ShowSession::default();
        let views = list_views(&mut session, "SALES", "Mixed Case").await.unwrap();
        assert_eq!(views, vec!["A", "B"]);
        assert_eq!(
            session.statements[0],
            "SHOW VIEWS IN SCHEMA \"SALES\".\"Mixed Case\""
        );
    }

    #[tokio::test]
    async fn test_use_warehouse() {
        let mut session = ShowSession::default();
        use_warehouse(&mut session, "COMPUTE_WH").await.unwrap();
        assert_eq!(session.statements[0], "USE WAREHOUSE \"COMPUTE_WH\"");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
