// ABOUTME: Warehouse session abstraction shared by the export workflow
// ABOUTME: Defines the statement result shape every session implementation returns

use anyhow::{bail, Result};
use async_trait::async_trait;

/// Rows and column names returned by a single statement
///
/// Cells are kept as text; `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// All non-NULL values of the named column, in row order
    pub fn column_values(&self, name: &str) -> Result<Vec<String>> {
        let Some(idx) = self.column_index(name) else {
            bail!(
                "Column '{}' not found in result (columns: {})",
                name,
                self.columns.join(", ")
            );
        };

        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(idx).cloned().flatten())
            .collect())
    }

    /// The value of a result that must be exactly one row with one column
    ///
    /// # Errors
    ///
    /// Returns an error if the result has zero or several rows, or if the
    /// single row does not have exactly one column.
    pub fn single_value(&self) -> Result<Option<&str>> {
        if self.rows.len() != 1 {
            bail!("Expected a single row, got {}", self.rows.len());
        }
        let row = &self.rows[0];
        if row.len() != 1 {
            bail!("Expected a single column, got {}", row.len());
        }
        Ok(row[0].as_deref())
    }

    /// Short human-readable rendering used in progress logs
    pub fn summary(&self) -> String {
        match self.rows.as_slice() {
            [] => "no rows".to_string(),
            [row] => row
                .iter()
                .map(|c| c.as_deref().unwrap_or("NULL"))
                .collect::<Vec<_>>()
                .join(" | "),
            rows => format!("{} rows", rows.len()),
        }
    }
}

/// A live connection to the warehouse
///
/// Statements issued through one session share its state (current role,
/// warehouse, database), so callers must keep using the same session for
/// statements that depend on each other.
#[async_trait]
pub trait WarehouseSession: Send {
    /// Execute one SQL statement and fetch all of its rows
    async fn execute(&mut self, sql: &str) -> Result<QueryResult>;

    /// End the session on the server
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        let result = QueryResult::new(
            vec!["SELECT_CLAUSE".into()],
            vec![vec![Some("a,\nb".into())]],
        );
        assert_eq!(result.single_value().unwrap(), Some("a,\nb"));

        let null = QueryResult::new(vec!["X".into()], vec![vec![None]]);
        assert_eq!(null.single_value().unwrap(), None);
    }

    #[test]
    fn test_single_value_shape_violations() {
        let empty = QueryResult::new(vec!["X".into()], vec![]);
        assert!(empty.single_value().is_err());

        let two_rows = QueryResult::new(vec!["X".into()], vec![vec![None], vec![None]]);
        assert!(two_rows.single_value().is_err());

        let two_cols = QueryResult::new(
            vec!["X".into(), "Y".into()],
            vec![vec![Some("a".into()), Some("b".into())]],
        );
        let err = two_cols.single_value().unwrap_err();
        assert!(err.to_string().contains("single column"));
    }

    #[test]
    fn test_column_values_case_insensitive() {
        let result = QueryResult::new(
            vec!["created_on".into(), "name".into()],
            vec![
                vec![Some("2024".into()), Some("DB1".into())],
                vec![Some("2024".into()), None],
                vec![Some("2025".into()), Some("DB2".into())],
            ],
        );
        assert_eq!(result.column_values("NAME").unwrap(), vec!["DB1", "DB2"]);
        assert!(result.column_values("owner").is_err());
    }

    #[test]
    fn test_summary() {
        let one = QueryResult::new(
            vec!["status".into()],
            vec![vec![Some("Statement executed successfully.".into())]],
        );
        assert_eq!(one.summary(), "Statement executed successfully.");
        assert_eq!(QueryResult::default().summary(), "no rows");
    }
}
