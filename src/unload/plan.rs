// ABOUTME: Generates the ordered SQL statements that unload one table to GCS
// ABOUTME: Grants role, creates a storage integration, copies out Parquet, cleans up

use crate::table_ref::TableRef;
use crate::utils::sanitize_path_component;

/// Role required to create and drop storage integrations
pub const INTEGRATION_ROLE: &str = "ACCOUNTADMIN";

/// Upper bound for a single unloaded file, in bytes
pub const MAX_FILE_SIZE: u64 = 100_000_000;

/// How storage integration names are derived
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IntegrationNaming {
    /// `gcs_integration_<db>_<schema>_<table>`; re-runs reuse the same name
    #[default]
    Deterministic,
    /// Deterministic name plus a per-run suffix so concurrent runs over the
    /// same table do not replace each other's integration
    RunScoped(String),
}

impl IntegrationNaming {
    /// A run-scoped naming with a random 8-hex-digit suffix
    pub fn run_scoped() -> Self {
        let suffix: u32 = rand::random();
        Self::RunScoped(format!("{:08x}", suffix))
    }

    fn integration_name(&self, database: &str, schema: &str, table: &str) -> String {
        let base = format!(
            "gcs_integration_{}_{}_{}",
            sanitize_path_component(database),
            sanitize_path_component(schema),
            sanitize_path_component(table)
        );
        match self {
            Self::Deterministic => base,
            Self::RunScoped(suffix) => format!("{}_{}", base, sanitize_path_component(suffix)),
        }
    }
}

/// The statements that unload one table, in execution order
///
/// Statement 3 (the copy-out) refers to the integration created by statement
/// 2, so the plan must run front to back on one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnloadPlan {
    integration_name: String,
    location: String,
    statements: Vec<String>,
}

impl UnloadPlan {
    pub fn integration_name(&self) -> &str {
        &self.integration_name
    }

    /// Target prefix the Parquet files are written under
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn into_statements(self) -> Vec<String> {
        self.statements
    }
}

/// Build the unload statements for `database.schema.table`
///
/// `base_path` is the storage prefix for the schema (for example
/// `gcs://bucket/public`); files land under `base_path/<sanitized table>/`.
/// `select_clause` is substituted verbatim into the copy-out SELECT.
///
/// # Examples
///
/// ```
/// # use snow2gcp::unload::build_unload_plan;
/// let plan = build_unload_plan("D1", "S1", "My View!", "gcs://bucket/s1", "a, b");
/// assert_eq!(plan.len(), 4);
/// assert_eq!(plan.location(), "gcs://bucket/s1/my_view_/");
/// assert_eq!(plan.integration_name(), "gcs_integration_d1_s1_my_view_");
/// ```
pub fn build_unload_plan(
    database: &str,
    schema: &str,
    table: &str,
    base_path: &str,
    select_clause: &str,
) -> UnloadPlan {
    build_unload_plan_with(
        database,
        schema,
        table,
        base_path,
        select_clause,
        &IntegrationNaming::Deterministic,
    )
}

/// Same as [`build_unload_plan`] with an explicit integration naming scheme
pub fn build_unload_plan_with(
    database: &str,
    schema: &str,
    table: &str,
    base_path: &str,
    select_clause: &str,
    naming: &IntegrationNaming,
) -> UnloadPlan {
    let location = format!("{}/{}/", base_path, sanitize_path_component(table));
    let integration_name = naming.integration_name(database, schema, table);

    let statements = vec![
        format!("USE ROLE {};", INTEGRATION_ROLE),
        format!(
            "CREATE OR REPLACE STORAGE INTEGRATION {integration}
  TYPE = EXTERNAL_STAGE
  STORAGE_PROVIDER = 'GCS'
  ENABLED = TRUE
  STORAGE_ALLOWED_LOCATIONS = ('{location}');",
            integration = integration_name,
            location = location,
        ),
        format!(
            "COPY INTO '{location}'
FROM (SELECT
        {select_clause}
FROM {database}.\"{schema}\".{table})
FILE_FORMAT = (TYPE = 'PARQUET', COMPRESSION = 'SNAPPY')
HEADER = TRUE
STORAGE_INTEGRATION = {integration}
OVERWRITE = TRUE
MAX_FILE_SIZE = {max_file_size};",
            location = location,
            select_clause = select_clause,
            database = database,
            schema = schema,
            table = table,
            integration = integration_name,
            max_file_size = MAX_FILE_SIZE,
        ),
        format!("DROP STORAGE INTEGRATION IF EXISTS {};", integration_name),
    ];

    UnloadPlan {
        integration_name,
        location,
        statements,
    }
}

/// Build the plan for a [`TableRef`]
pub fn plan_for(
    table: &TableRef,
    base_path: &str,
    select_clause: &str,
    naming: &IntegrationNaming,
) -> UnloadPlan {
    build_unload_plan_with(
        table.database(),
        table.schema(),
        table.table(),
        base_path,
        select_clause,
        naming,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> UnloadPlan {
        build_unload_plan(
            "D1",
            "S1",
            "My View!",
            "gcs://bucket/s1",
            "a,CONVERT_TIMEZONE('UTC', b)::TIMESTAMP as b",
        )
    }

    #[test]
    fn test_plan_has_four_statements_in_order() {
        let plan = sample_plan();
        let statements = plan.statements();
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], "USE ROLE ACCOUNTADMIN;");
        assert!(statements[1].starts_with("CREATE OR REPLACE STORAGE INTEGRATION"));
        assert!(statements[2].starts_with("COPY INTO"));
        assert!(statements[3].starts_with("DROP STORAGE INTEGRATION IF EXISTS"));
    }

    #[test]
    fn test_integration_name_shared_across_statements() {
        let plan = sample_plan();
        let name = plan.integration_name();
        assert_eq!(name, "gcs_integration_d1_s1_my_view_");
        for statement in &plan.statements()[1..] {
            assert!(statement.contains(name), "{} missing from {}", name, statement);
        }
    }

    #[test]
    fn test_location_uses_sanitized_table() {
        let plan = sample_plan();
        assert_eq!(plan.location(), "gcs://bucket/s1/my_view_/");
        assert!(plan.statements()[1].contains("STORAGE_ALLOWED_LOCATIONS = ('gcs://bucket/s1/my_view_/')"));
        assert!(plan.statements()[2].contains("COPY INTO 'gcs://bucket/s1/my_view_/'"));
    }

    #[test]
    fn test_copy_statement_format_options() {
        let plan = sample_plan();
        let copy = &plan.statements()[2];
        assert!(copy.contains("a,CONVERT_TIMEZONE('UTC', b)::TIMESTAMP as b"));
        assert!(copy.contains("FROM D1.\"S1\".My View!)"));
        assert!(copy.contains("TYPE = 'PARQUET', COMPRESSION = 'SNAPPY'"));
        assert!(copy.contains("HEADER = TRUE"));
        assert!(copy.contains("OVERWRITE = TRUE"));
        assert!(copy.contains("MAX_FILE_SIZE = 100000000;"));
    }

    #[test]
    fn test_deterministic_naming_is_stable() {
        assert_eq!(sample_plan(), sample_plan());
    }

    #[test]
    fn test_run_scoped_naming() {
        let naming = IntegrationNaming::RunScoped("1a2b3c4d".to_string());
        let plan = build_unload_plan_with("D", "S", "T", "gcs://b/s", "x", &naming);
        assert_eq!(plan.integration_name(), "gcs_integration_d_s_t_1a2b3c4d");
        assert!(plan.statements()[2].contains("STORAGE_INTEGRATION = gcs_integration_d_s_t_1a2b3c4d"));
        assert!(plan.statements()[3].ends_with("gcs_integration_d_s_t_1a2b3c4d;"));

        match IntegrationNaming::run_scoped() {
            IntegrationNaming::RunScoped(suffix) => assert_eq!(suffix.len(), 8),
            other => panic!("unexpected naming {:?}", other),
        }
    }
}
