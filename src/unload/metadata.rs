// ABOUTME: Builds the information-schema query that yields a table's SELECT clause
// ABOUTME: Converts timestamp-like columns to UTC so Parquet output is zone-free

use crate::utils::{quote_literal, sanitize_identifier};

/// Build the query that produces the SELECT clause for one table
///
/// The query aggregates every column of `database.schema.table` into a single
/// `,\n`-joined value, ordered by ordinal position. Columns whose data type
/// contains `TIMESTAMP` or `DATETIME` are wrapped as
/// `CONVERT_TIMEZONE('UTC', col)::TIMESTAMP as col`; every other column is
/// passed through by name.
///
/// The result is one row with one column (`SELECT_CLAUSE`).
///
/// # Examples
///
/// ```
/// # use snow2gcp::unload::build_metadata_query;
/// let sql = build_metadata_query("SALES", "PUBLIC", "ORDERS_V");
/// assert!(sql.contains("FROM SALES.INFORMATION_SCHEMA.COLUMNS"));
/// assert!(sql.contains("TABLE_NAME = 'ORDERS_V'"));
/// assert!(sql.contains("ORDER BY ORDINAL_POSITION"));
/// ```
pub fn build_metadata_query(database: &str, schema: &str, table: &str) -> String {
    format!(
        r#"-- SELECT clause for {header}
SELECT LISTAGG(
    CASE
        WHEN DATA_TYPE LIKE '%TIMESTAMP%'
             OR DATA_TYPE LIKE '%DATETIME%'
        THEN 'CONVERT_TIMEZONE(''UTC'', ' || COLUMN_NAME || ')::TIMESTAMP as ' || COLUMN_NAME
        ELSE COLUMN_NAME
    END,
    ',\n'
) WITHIN GROUP (ORDER BY ORDINAL_POSITION) AS SELECT_CLAUSE
FROM {database}.INFORMATION_SCHEMA.COLUMNS
WHERE TABLE_SCHEMA = {schema_literal}
    AND TABLE_NAME = {table_literal};"#,
        database = database,
        header = sanitize_identifier(&format!("{}.{}.{}", database, schema, table)),
        schema_literal = quote_literal(schema),
        table_literal = quote_literal(table),
    )
}
