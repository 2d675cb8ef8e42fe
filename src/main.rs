// ABOUTME: CLI entry point for snow2gcp
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Args, Parser, Subcommand};
use snow2gcp::commands::{self, ExportOptions, ListTarget, WorklistArgs};
use snow2gcp::config::{BigQueryConfig, CredentialOverrides, SnowflakeCredentials};
use snow2gcp::export::{FailureLog, DEFAULT_FAILURE_LOG};

#[derive(Parser)]
#[command(name = "snow2gcp")]
#[command(about = "Unload Snowflake tables to GCS as Parquet and load them into BigQuery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Snowflake connection flags; unset values fall back to SNOWFLAKE_* variables
#[derive(Args)]
struct ConnectionArgs {
    /// Account identifier (overrides SNOWFLAKE_ACCOUNT)
    #[arg(long)]
    account: Option<String>,
    /// Login name (overrides SNOWFLAKE_USER)
    #[arg(long)]
    user: Option<String>,
    /// Warehouse to run on (overrides SNOWFLAKE_WAREHOUSE)
    #[arg(long)]
    warehouse: Option<String>,
    /// Session role at login (overrides SNOWFLAKE_ROLE)
    #[arg(long)]
    role: Option<String>,
}

impl ConnectionArgs {
    fn credentials(self) -> anyhow::Result<SnowflakeCredentials> {
        SnowflakeCredentials::from_env_with(&CredentialOverrides {
            account: self.account,
            user: self.user,
            warehouse: self.warehouse,
            role: self.role,
        })
    }
}

/// Where the tables to process come from
#[derive(Args)]
struct WorklistFlags {
    /// TOML config with [gcs], optional [bigquery], and [[tables]]
    #[arg(long)]
    config: Option<String>,
    /// Target GCS bucket (overrides [gcs] bucket)
    #[arg(long)]
    bucket: Option<String>,
    /// Table to process (format: database.schema.table, repeatable)
    #[arg(long = "table")]
    tables: Vec<String>,
    /// Also process every table recorded in the failure log
    #[arg(long)]
    retry_failed: bool,
    /// Failure log path
    #[arg(long, default_value = DEFAULT_FAILURE_LOG)]
    failure_log: String,
}

impl WorklistFlags {
    fn failure_log(&self) -> FailureLog {
        FailureLog::new(&self.failure_log)
    }

    fn worklist_args(&self) -> WorklistArgs {
        WorklistArgs {
            config_path: self.config.clone(),
            bucket: self.bucket.clone(),
            tables: self.tables.clone(),
            retry_from: self.retry_failed.then(|| self.failure_log()),
        }
    }
}

/// BigQuery destination flags
#[derive(Args)]
struct BigQueryArgs {
    /// BigQuery project to load into (overrides [bigquery] project)
    #[arg(long)]
    bigquery_project: Option<String>,
    /// Location for new datasets and load jobs (e.g. US, EU)
    #[arg(long)]
    bigquery_location: Option<String>,
}

impl BigQueryArgs {
    /// CLI project wins; the location falls back to the config file's
    fn resolve(self, from_config: Option<BigQueryConfig>) -> Option<BigQueryConfig> {
        match (self.bigquery_project, from_config) {
            (Some(project), config) => Some(BigQueryConfig {
                project,
                location: self
                    .bigquery_location
                    .or_else(|| config.and_then(|c| c.location)),
            }),
            (None, Some(mut config)) => {
                if self.bigquery_location.is_some() {
                    config.location = self.bigquery_location;
                }
                Some(config)
            }
            (None, None) => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Unload tables to GCS as Parquet, then optionally load them into BigQuery
    Export {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        worklist: WorklistFlags,
        #[command(flatten)]
        bigquery: BigQueryArgs,
        /// Interactive mode for selecting warehouse, database, schema, and views
        #[arg(long)]
        interactive: bool,
        /// Load exported views into BigQuery when every export succeeds
        #[arg(long)]
        load_bigquery: bool,
        /// Suffix storage integration names with a per-run token
        #[arg(long)]
        unique_integrations: bool,
    },
    /// Print the SQL script each table would run without executing it
    Plan {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        worklist: WorklistFlags,
    },
    /// List warehouses, databases, schemas of a database, or views of a schema
    List {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// List schemas of this database (or its views with --schema)
        #[arg(long)]
        database: Option<String>,
        /// List views of this schema (requires --database)
        #[arg(long, requires = "database")]
        schema: Option<String>,
        /// List warehouses instead
        #[arg(long, conflicts_with_all = ["database", "schema"])]
        warehouses: bool,
    },
    /// Load already-exported Parquet files from GCS into BigQuery
    Load {
        #[command(flatten)]
        worklist: WorklistFlags,
        #[command(flatten)]
        bigquery: BigQueryArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            connection,
            worklist,
            bigquery,
            interactive,
            load_bigquery,
            unique_integrations,
        } => {
            let credentials = connection.credentials()?;
            let failure_log = worklist.failure_log();
            let resolved = commands::build_worklist(&worklist.worklist_args())?;

            if !interactive && resolved.tables.is_empty() {
                anyhow::bail!(
                    "No tables to export.\n\
                     Use --config, --table, --retry-failed, or --interactive."
                );
            }

            let bigquery = if load_bigquery {
                let config = bigquery.resolve(resolved.bigquery.clone());
                if config.is_none() {
                    anyhow::bail!(
                        "--load-bigquery needs a project.\n\
                         Pass --bigquery-project or set [bigquery] project in the config file."
                    );
                }
                config
            } else {
                None
            };

            let summary = commands::export(
                &credentials,
                ExportOptions {
                    worklist: resolved,
                    interactive,
                    failure_log: failure_log.clone(),
                    unique_integrations,
                    bigquery,
                },
            )
            .await?;

            if !summary.is_success() {
                anyhow::bail!(
                    "{} table(s) failed and {} were not started; see {}",
                    summary.failed,
                    summary.skipped,
                    failure_log.path().display()
                );
            }
            Ok(())
        }
        Commands::Plan {
            connection,
            worklist,
        } => {
            let credentials = connection.credentials()?;
            let resolved = commands::build_worklist(&worklist.worklist_args())?;
            commands::plan(&credentials, &resolved).await
        }
        Commands::List {
            connection,
            database,
            schema,
            warehouses,
        } => {
            let credentials = connection.credentials()?;
            commands::list(
                &credentials,
                ListTarget::from_scope(database, schema, warehouses),
            )
            .await
        }
        Commands::Load { worklist, bigquery } => {
            let resolved = commands::build_worklist(&worklist.worklist_args())?;
            let config = bigquery.resolve(resolved.bigquery.clone());
            commands::load(&resolved, config).await
        }
    }
}
