// ABOUTME: Minimal BigQuery REST client for dataset creation and load jobs
// ABOUTME: Resolves an OAuth access token and polls load jobs until done

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use which::which;

const API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
const MAX_POLL_DELAY: Duration = Duration::from_secs(10);

/// Obtain an OAuth access token for BigQuery
///
/// Uses `GOOGLE_OAUTH_ACCESS_TOKEN` when set, otherwise asks the `gcloud`
/// CLI for the active account's token.
///
/// # Errors
///
/// Returns an error if neither source is available or `gcloud` fails.
pub async fn access_token() -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }

    let gcloud = which("gcloud").map_err(|_| {
        anyhow::anyhow!(
            "No BigQuery credentials found.\n\
             \n\
             Either set {} or install the Google Cloud CLI and run:\n\
             - gcloud auth login",
            TOKEN_ENV
        )
    })?;

    let output = tokio::process::Command::new(gcloud)
        .args(["auth", "print-access-token"])
        .output()
        .await
        .context("Failed to run 'gcloud auth print-access-token'")?;

    if !output.status.success() {
        bail!(
            "gcloud could not provide an access token: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let token = String::from_utf8(output.stdout)
        .context("gcloud returned a non-UTF-8 token")?
        .trim()
        .to_string();
    if token.is_empty() {
        bail!("gcloud returned an empty access token");
    }
    Ok(token)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetResource<'a> {
    dataset_reference: DatasetReference<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobResource<'a> {
    job_reference: JobReferenceOut<'a>,
    configuration: JobConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobReferenceOut<'a> {
    project_id: &'a str,
    job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JobConfiguration<'a> {
    load: LoadConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadConfiguration<'a> {
    source_uris: Vec<&'a str>,
    destination_table: TableReference<'a>,
    source_format: &'static str,
    write_disposition: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReferenceIn,
    #[serde(default)]
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReferenceIn {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: Option<String>,
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

impl Job {
    fn is_done(&self) -> bool {
        self.status.state.as_deref() == Some("DONE")
    }

    fn check_error(&self) -> Result<()> {
        if let Some(ref err) = self.status.error_result {
            bail!(
                "BigQuery job {} failed: {} ({})",
                self.job_reference.job_id,
                err.message.as_deref().unwrap_or("unknown error"),
                err.reason.as_deref().unwrap_or("no reason")
            );
        }
        Ok(())
    }
}

/// BigQuery access for one project
pub struct BigQueryClient {
    http: reqwest::Client,
    project: String,
    location: Option<String>,
    token: String,
}

impl std::fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project", &self.project)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl BigQueryClient {
    /// Create a client, resolving the access token with [`access_token`]
    pub async fn new(project: &str, location: Option<&str>) -> Result<Self> {
        let token = access_token().await?;
        Ok(Self::with_token(project, location, token))
    }

    pub fn with_token(project: &str, location: Option<&str>, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            project: project.to_string(),
            location: location.map(str::to_string),
            token,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Create the dataset unless it already exists
    pub async fn ensure_dataset(&self, dataset_id: &str) -> Result<()> {
        let url = format!("{}/projects/{}/datasets/{}", API_BASE, self.project, dataset_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to look up dataset '{}'", dataset_id))?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!("  Dataset {} already exists", dataset_id);
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            status => bail!(
                "Failed to look up dataset '{}' (HTTP {}): {}",
                dataset_id,
                status,
                response.text().await.unwrap_or_default()
            ),
        }

        let body = DatasetResource {
            dataset_reference: DatasetReference {
                project_id: &self.project,
                dataset_id,
            },
            location: self.location.as_deref(),
        };
        let response = self
            .http
            .post(format!("{}/projects/{}/datasets", API_BASE, self.project))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to create dataset '{}'", dataset_id))?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!("  ✓ Created dataset {}", dataset_id);
                Ok(())
            }
            // Created concurrently by someone else
            StatusCode::CONFLICT => Ok(()),
            status => bail!(
                "Failed to create dataset '{}' (HTTP {}): {}",
                dataset_id,
                status,
                response.text().await.unwrap_or_default()
            ),
        }
    }

    /// Replace `dataset_id.table_id` with the Parquet files at `source_uri`
    ///
    /// Waits for the load job to finish.
    pub async fn load_parquet(&self, source_uri: &str, dataset_id: &str, table_id: &str) -> Result<()> {
        let body = JobResource {
            job_reference: JobReferenceOut {
                project_id: &self.project,
                job_id: format!("snow2gcp_{}", uuid::Uuid::new_v4().simple()),
                location: self.location.as_deref(),
            },
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    source_uris: vec![source_uri],
                    destination_table: TableReference {
                        project_id: &self.project,
                        dataset_id,
                        table_id,
                    },
                    source_format: "PARQUET",
                    write_disposition: "WRITE_TRUNCATE",
                },
            },
        };

        let mut job: Job = self
            .http
            .post(format!("{}/projects/{}/jobs", API_BASE, self.project))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .context("Failed to submit BigQuery load job")?
            .error_for_status()
            .context("BigQuery rejected the load job")?
            .json()
            .await
            .context("Failed to parse BigQuery job response")?;

        tracing::info!("  BigQuery load job {} started", job.job_reference.job_id);

        let mut delay = Duration::from_secs(1);
        while !job.is_done() {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(MAX_POLL_DELAY);
            job = self.get_job(&job.job_reference).await?;
        }

        job.check_error()
    }

    async fn get_job(&self, reference: &JobReferenceIn) -> Result<Job> {
        let mut request = self
            .http
            .get(format!(
                "{}/projects/{}/jobs/{}",
                API_BASE, self.project, reference.job_id
            ))
            .bearer_auth(&self.token);
        if let Some(ref location) = reference.location {
            request = request.query(&[("location", location.as_str())]);
        }

        request
            .send()
            .await
            .context("Failed to poll BigQuery job")?
            .error_for_status()
            .context("BigQuery rejected the job status request")?
            .json()
            .await
            .context("Failed to parse BigQuery job status")
    }
}
