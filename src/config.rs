// ABOUTME: Loads credentials from the environment and worklists from TOML files
// ABOUTME: Converts the export config file into validated TableRef lists

use crate::table_ref::TableRef;
use crate::utils::normalize_bucket;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;

/// Snowflake login settings
///
/// Read from `SNOWFLAKE_USER`, `SNOWFLAKE_PASSWORD`, `SNOWFLAKE_ACCOUNT` and
/// the optional `SNOWFLAKE_WAREHOUSE`, `SNOWFLAKE_DATABASE`,
/// `SNOWFLAKE_SCHEMA`, `SNOWFLAKE_ROLE`.
#[derive(Clone, Default)]
pub struct SnowflakeCredentials {
    pub account: String,
    pub user: String,
    pub password: String,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
}

impl std::fmt::Debug for SnowflakeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeCredentials")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"***")
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .finish()
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Command-line values that take precedence over `SNOWFLAKE_*` variables
///
/// The password is only ever read from the environment.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub account: Option<String>,
    pub user: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
}

impl CredentialOverrides {
    fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            "SNOWFLAKE_ACCOUNT" => &self.account,
            "SNOWFLAKE_USER" => &self.user,
            "SNOWFLAKE_WAREHOUSE" => &self.warehouse,
            "SNOWFLAKE_ROLE" => &self.role,
            _ => return None,
        };
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

impl SnowflakeCredentials {
    /// Read credentials from `SNOWFLAKE_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error naming every required variable that is missing.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(optional_var)
    }

    /// Read credentials from the environment, preferring values in `overrides`
    pub fn from_env_with(overrides: &CredentialOverrides) -> Result<Self> {
        Self::from_lookup(|name| overrides.get(name).or_else(|| optional_var(name)))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |name: &'static str| {
            lookup(name).unwrap_or_else(|| {
                missing.push(name);
                String::new()
            })
        };

        let user = required("SNOWFLAKE_USER");
        let password = required("SNOWFLAKE_PASSWORD");
        let account = required("SNOWFLAKE_ACCOUNT");

        if !missing.is_empty() {
            bail!(
                "Missing Snowflake credentials: {}\n\
                 Set them in the environment before running.",
                missing.join(", ")
            );
        }

        Ok(Self {
            account,
            user,
            password,
            warehouse: lookup("SNOWFLAKE_WAREHOUSE"),
            database: lookup("SNOWFLAKE_DATABASE"),
            schema: lookup("SNOWFLAKE_SCHEMA"),
            role: lookup("SNOWFLAKE_ROLE"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ExportConfigFile {
    gcs: GcsConfig,
    #[serde(default)]
    bigquery: Option<BigQueryConfig>,
    #[serde(default)]
    tables: Vec<TableRef>,
}

#[derive(Debug, Deserialize)]
struct GcsConfig {
    bucket: String,
}

/// Destination settings for the optional BigQuery load
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BigQueryConfig {
    pub project: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Validated contents of an export config file
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub bucket: String,
    pub bigquery: Option<BigQueryConfig>,
    pub tables: Vec<TableRef>,
}

/// Parse an export config from TOML text
///
/// ```toml
/// [gcs]
/// bucket = "my-bucket"
///
/// [bigquery]
/// project = "my-project"
/// location = "US"
///
/// [[tables]]
/// database = "SALES"
/// schema = "PUBLIC"
/// table = "ORDERS_V"
/// ```
pub fn parse_export_config(raw: &str) -> Result<ExportConfig> {
    let parsed: ExportConfigFile = toml::from_str(raw).context("Failed to parse TOML config")?;

    let bucket = normalize_bucket(&parsed.gcs.bucket).context("Invalid [gcs] bucket")?;

    for (idx, table) in parsed.tables.iter().enumerate() {
        if table.database().is_empty() || table.schema().is_empty() || table.table().is_empty() {
            bail!(
                "Table entry {} must set database, schema, and table (got '{}')",
                idx + 1,
                table
            );
        }
    }

    if let Some(ref bq) = parsed.bigquery {
        if bq.project.trim().is_empty() {
            bail!("[bigquery] project cannot be empty");
        }
    }

    Ok(ExportConfig {
        bucket,
        bigquery: parsed.bigquery,
        tables: parsed.tables,
    })
}

/// Load an export config file from disk
pub fn load_export_config(path: &str) -> Result<ExportConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path))?;
    parse_export_config(&raw).with_context(|| format!("Invalid config file at {}", path))
}
