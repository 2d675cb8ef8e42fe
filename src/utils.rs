// ABOUTME: Utility functions for identifier handling and input validation
// ABOUTME: Provides path sanitizing, SQL literal quoting, and bucket normalization

use anyhow::{bail, Result};

/// Sanitize a database, schema, or table name for use in a storage path
///
/// Lower-cases the input and replaces every character outside `[a-z0-9_]`
/// with `_`. Replacement is one-for-one, so runs of invalid characters are not
/// collapsed and the output has the same number of characters as the input.
///
/// # Examples
///
/// ```
/// # use snow2gcp::utils::sanitize_path_component;
/// assert_eq!(sanitize_path_component("My View!"), "my_view_");
/// assert_eq!(sanitize_path_component("ORDERS_2024"), "orders_2024");
/// assert_eq!(sanitize_path_component(""), "");
/// ```
pub fn sanitize_path_component(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            // Lower-casing is per character so expansions like 'İ' cannot
            // change the output length
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) if l.is_ascii_lowercase() || l.is_ascii_digit() || l == '_' => l,
                _ => '_',
            }
        })
        .collect()
}

/// Quote a value as a SQL string literal
///
/// Wraps the value in single quotes and doubles any embedded single quote.
///
/// # Examples
///
/// ```
/// # use snow2gcp::utils::quote_literal;
/// assert_eq!(quote_literal("PUBLIC"), "'PUBLIC'");
/// assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Remove every newline from a multi-line SELECT clause
///
/// The metadata query joins column expressions with `,\n`; the unload
/// statement embeds the clause on a single line.
pub fn collapse_lines(clause: &str) -> String {
    clause.split('\n').collect()
}

/// Sanitize an identifier for display
///
/// Removes control characters and limits length to keep log lines readable.
///
/// # Examples
///
/// ```
/// # use snow2gcp::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Normalize a bucket name entered with or without a scheme
///
/// Strips a leading `gs://` or `gcs://` and any trailing `/`.
///
/// # Errors
///
/// Returns an error if nothing is left after stripping, or if the remainder
/// still contains a `/` (object prefixes are derived, never supplied).
///
/// # Examples
///
/// ```
/// # use snow2gcp::utils::normalize_bucket;
/// assert_eq!(normalize_bucket("gs://my-bucket/").unwrap(), "my-bucket");
/// assert_eq!(normalize_bucket("my-bucket").unwrap(), "my-bucket");
/// assert!(normalize_bucket("gs://").is_err());
/// ```
pub fn normalize_bucket(bucket: &str) -> Result<String> {
    let trimmed = bucket.trim();
    let stripped = trimmed
        .strip_prefix("gs://")
        .or_else(|| trimmed.strip_prefix("gcs://"))
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    if stripped.is_empty() {
        bail!("Bucket name cannot be empty");
    }
    if stripped.contains('/') {
        bail!(
            "Bucket name '{}' must not contain a path.\n\
             Object prefixes are derived from the schema and table names.",
            sanitize_identifier(stripped)
        );
    }

    Ok(stripped.to_string())
}

/// Parse a `database.schema.table` triple
///
/// The first two dots separate database and schema; anything after the
/// second dot is the table name, so `DB.S.orders.v2` names table `orders.v2`.
///
/// # Errors
///
/// Returns an error unless the value has three non-empty parts.
pub fn parse_table_triple(value: &str) -> Result<(String, String, String)> {
    let parts: Vec<&str> = value.splitn(3, '.').collect();
    match parts.as_slice() {
        [db, schema, table] if !db.is_empty() && !schema.is_empty() && !table.is_empty() => {
            Ok((db.to_string(), schema.to_string(), table.to_string()))
        }
        _ => bail!(
            "Table must be specified as 'database.schema.table', got '{}'",
            sanitize_identifier(value)
        ),
    }
}
