// ABOUTME: Identity of a warehouse table or view selected for export
// ABOUTME: Holds the database/schema/table triple and its path-safe forms

use crate::utils::{parse_table_triple, sanitize_path_component};
use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A `database.schema.table` triple
///
/// Names are kept exactly as the warehouse reports them; the sanitized forms
/// are only used for storage paths and downstream table names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct TableRef {
    database: String,
    schema: String,
    table: String,
}

impl TableRef {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn sanitized_database(&self) -> String {
        sanitize_path_component(&self.database)
    }

    pub fn sanitized_schema(&self) -> String {
        sanitize_path_component(&self.schema)
    }

    pub fn sanitized_table(&self) -> String {
        sanitize_path_component(&self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

impl FromStr for TableRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (database, schema, table) = parse_table_triple(s)?;
        Ok(Self::new(database, schema, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let table: TableRef = "D1.S1.My View!".parse().unwrap();
        assert_eq!(table.database(), "D1");
        assert_eq!(table.schema(), "S1");
        assert_eq!(table.table(), "My View!");
        assert_eq!(table.to_string(), "D1.S1.My View!");
    }

    #[test]
    fn test_sanitized_components() {
        let table = TableRef::new("D1", "S1", "My View!");
        assert_eq!(table.sanitized_database(), "d1");
        assert_eq!(table.sanitized_schema(), "s1");
        assert_eq!(table.sanitized_table(), "my_view_");
    }
}
