// ABOUTME: Snowflake session over the REST session protocol
// ABOUTME: Handles login, statement execution with result polling, and logout

use crate::config::SnowflakeCredentials;
use crate::session::{QueryResult, WarehouseSession};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Client identity sent at login
const CLIENT_APP_ID: &str = env!("CARGO_PKG_NAME");
const CLIENT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response codes meaning the statement is still running
const QUERY_IN_PROGRESS: &str = "333333";
const QUERY_IN_PROGRESS_ASYNC: &str = "333334";

/// Response code for an expired session token
const SESSION_EXPIRED: &str = "390112";

/// Key the server uses to encrypt remote result chunks when it sends no headers
const SSE_C_ALGORITHM_HEADER: &str = "x-amz-server-side-encryption-customer-algorithm";
const SSE_C_KEY_HEADER: &str = "x-amz-server-side-encryption-customer-key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_POLL_DELAY: Duration = Duration::from_secs(10);

/// Resolve the host name for an account identifier
///
/// Accepts either a bare account identifier (`xy12345.us-east-1`) or a full
/// host (`xy12345.us-east-1.snowflakecomputing.com`, with or without scheme).
///
/// # Examples
///
/// ```
/// # use snow2gcp::snowflake::connection::account_host;
/// assert_eq!(account_host("xy12345"), "xy12345.snowflakecomputing.com");
/// assert_eq!(
///     account_host("https://xy12345.eu-west-1.snowflakecomputing.com/"),
///     "xy12345.eu-west-1.snowflakecomputing.com"
/// );
/// ```
pub fn account_host(account: &str) -> String {
    let trimmed = account
        .trim()
        .trim_start_matches("https://")
        .trim_end_matches('/');
    if trimmed.ends_with(".snowflakecomputing.com") {
        trimmed.to_string()
    } else {
        format!("{}.snowflakecomputing.com", trimmed)
    }
}

/// Account name sent at login: the identifier up to the first `.`
pub fn account_name(account: &str) -> String {
    let host = account_host(account);
    host.split('.').next().unwrap_or(&host).to_uppercase()
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    data: LoginRequestData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginRequestData<'a> {
    client_app_id: &'a str,
    client_app_version: &'a str,
    account_name: String,
    login_name: &'a str,
    password: &'a str,
    session_parameters: HashMap<&'a str, &'a str>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: Option<LoginData>,
    code: Option<String>,
    message: Option<String>,
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    token: String,
    #[serde(default)]
    master_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    old_session_token: &'a str,
    request_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    data: Option<TokenData>,
    code: Option<String>,
    message: Option<String>,
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    session_token: String,
    #[serde(default)]
    master_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    sql_text: &'a str,
    async_exec: bool,
    sequence_id: u64,
    is_internal: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: Option<QueryData>,
    code: Option<String>,
    message: Option<String>,
    success: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<Value>>,
    #[serde(default)]
    chunks: Vec<Chunk>,
    #[serde(default)]
    chunk_headers: HashMap<String, String>,
    query_id: Option<String>,
    get_result_url: Option<String>,
    qrmk: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Chunk {
    url: String,
}

impl QueryResponse {
    fn is_session_expired(&self) -> bool {
        self.code.as_deref() == Some(SESSION_EXPIRED)
    }

    fn is_in_progress(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some(QUERY_IN_PROGRESS) | Some(QUERY_IN_PROGRESS_ASYNC)
        )
    }

    fn error_message(&self) -> String {
        format!(
            "{} (code {})",
            self.message.as_deref().unwrap_or("unknown error"),
            self.code.as_deref().unwrap_or("none")
        )
    }
}

impl QueryData {
    fn columns(&self) -> Vec<String> {
        self.rowtype.iter().map(|r| r.name.clone()).collect()
    }

    /// Headers for downloading remote chunks
    ///
    /// Uses the server-provided chunk headers; without them, the `qrmk` key
    /// is sent as SSE-C headers.
    fn chunk_download_headers(&self) -> Vec<(String, String)> {
        if !self.chunk_headers.is_empty() {
            return self
                .chunk_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        match self.qrmk {
            Some(ref key) => vec![
                (SSE_C_ALGORITHM_HEADER.to_string(), "AES256".to_string()),
                (SSE_C_KEY_HEADER.to_string(), key.clone()),
            ],
            None => Vec::new(),
        }
    }
}

fn cell_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn rows_to_text(rows: Vec<Vec<Value>>) -> Vec<Vec<Option<String>>> {
    rows.into_iter()
        .map(|row| row.into_iter().map(cell_to_text).collect())
        .collect()
}

/// Map a failed login response to an operator-facing message
fn login_error(response: &LoginResponse) -> anyhow::Error {
    let message = response.message.as_deref().unwrap_or("unknown error");
    let code = response.code.as_deref().unwrap_or("none");

    if message.contains("Incorrect username or password") {
        anyhow::anyhow!(
            "Authentication failed: Invalid username or password.\n\
             Please verify SNOWFLAKE_USER and SNOWFLAKE_PASSWORD."
        )
    } else if message.contains("does not exist") || message.contains("not found") {
        anyhow::anyhow!(
            "Login target not found: {}\n\
             Please check the account identifier and the default warehouse/database/role.",
            message
        )
    } else {
        anyhow::anyhow!("Failed to log in to Snowflake: {} (code {})", message, code)
    }
}

/// An authenticated Snowflake session
///
/// Session state (current role, warehouse, database) lives on the server and
/// is shared by every statement issued through this value.
pub struct SnowflakeSession {
    http: reqwest::Client,
    base_url: String,
    token: String,
    /// Long-lived token used only to renew `token`
    master_token: Option<String>,
    sequence_id: u64,
}

impl std::fmt::Debug for SnowflakeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeSession")
            .field("base_url", &self.base_url)
            .field("sequence_id", &self.sequence_id)
            .finish_non_exhaustive()
    }
}

/// Log in to Snowflake with user and password
///
/// # Errors
///
/// Returns an error if the account host is unreachable, the credentials are
/// rejected, or the default warehouse/database/role cannot be used. A failed
/// connection is fatal for the whole run.
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use snow2gcp::config::SnowflakeCredentials;
/// # use snow2gcp::snowflake::connect;
/// # async fn example() -> Result<()> {
/// let credentials = SnowflakeCredentials::from_env()?;
/// let session = connect(&credentials).await?;
/// # Ok(())
/// # }
/// ```
pub async fn connect(credentials: &SnowflakeCredentials) -> Result<SnowflakeSession> {
    let base_url = format!("https://{}", account_host(&credentials.account));

    let http = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let mut query: Vec<(&str, String)> = vec![("request_id", uuid::Uuid::new_v4().to_string())];
    if let Some(ref warehouse) = credentials.warehouse {
        query.push(("warehouse", warehouse.clone()));
    }
    if let Some(ref database) = credentials.database {
        query.push(("databaseName", database.clone()));
    }
    if let Some(ref schema) = credentials.schema {
        query.push(("schemaName", schema.clone()));
    }
    if let Some(ref role) = credentials.role {
        query.push(("roleName", role.clone()));
    }

    let body = LoginRequest {
        data: LoginRequestData {
            client_app_id: CLIENT_APP_ID,
            client_app_version: CLIENT_APP_VERSION,
            account_name: account_name(&credentials.account),
            login_name: &credentials.user,
            password: &credentials.password,
            session_parameters: HashMap::from([("QUERY_RESULT_FORMAT", "JSON")]),
        },
    };

    tracing::debug!("Logging in to {} as {}", base_url, credentials.user);
    let response = http
        .post(format!("{}/session/v1/login-request", base_url))
        .query(&query)
        .headers(base_headers()?)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!(
                    "Connection timeout: {} did not respond in time.\n\
                     Error: {}",
                    base_url,
                    e
                )
            } else if e.is_connect() {
                anyhow::anyhow!(
                    "Connection refused: Unable to reach {}.\n\
                     Please check the account identifier and network access.\n\
                     Error: {}",
                    base_url,
                    e
                )
            } else {
                anyhow::anyhow!("Failed to connect to Snowflake: {}", e)
            }
        })?;

    let status = response.status();
    let login: LoginResponse = response
        .json()
        .await
        .with_context(|| format!("Unexpected login response from {} (HTTP {})", base_url, status))?;

    if !login.success {
        return Err(login_error(&login));
    }
    let data = login
        .data
        .context("Login response did not contain a session token")?;

    Ok(SnowflakeSession {
        http,
        base_url,
        token: data.token,
        master_token: data.master_token,
        sequence_id: 0,
    })
}

fn base_headers() -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(4);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        concat!(env!("CARGO_PKG_NAME"), '/', env!("CARGO_PKG_VERSION")).parse()?,
    );
    Ok(headers)
}

fn token_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = base_headers()?;
    headers.insert(ACCEPT, HeaderValue::from_static("application/snowflake"));
    headers.insert(
        AUTHORIZATION,
        format!("Snowflake Token=\"{}\"", token)
            .parse()
            .context("Session token is not a valid header value")?,
    );
    Ok(headers)
}

impl SnowflakeSession {
    fn auth_headers(&self) -> Result<HeaderMap> {
        token_headers(&self.token)
    }

    /// Exchange the master token for a fresh session token
    ///
    /// Server-side session state (role, warehouse) is kept.
    async fn renew_token(&mut self) -> Result<()> {
        tracing::info!("Snowflake session token expired; renewing");

        let master_token = self
            .master_token
            .as_deref()
            .context("Snowflake session expired and no master token is available to renew it")?;
        let headers = token_headers(master_token)?;
        let body = TokenRequest {
            old_session_token: &self.token,
            request_type: "RENEW",
        };

        let response: TokenResponse = self
            .http
            .post(format!("{}/session/token-request", self.base_url))
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("Failed to send session renewal request")?
            .error_for_status()
            .context("Snowflake rejected the session renewal request")?
            .json()
            .await
            .context("Failed to parse session renewal response")?;

        if !response.success {
            bail!(
                "Failed to renew Snowflake session: {} (code {})",
                response.message.as_deref().unwrap_or("unknown error"),
                response.code.as_deref().unwrap_or("none")
            );
        }
        let data = response
            .data
            .context("Session renewal response did not contain a token")?;

        self.token = data.session_token;
        if data.master_token.is_some() {
            self.master_token = data.master_token;
        }
        tracing::info!("✓ Snowflake session renewed");
        Ok(())
    }

    /// Submit a statement, renewing the session once if its token expired
    ///
    /// An expired token is rejected before the statement runs, so the
    /// resubmission never executes it twice.
    async fn submit_with_renewal(&mut self, sql: &str) -> Result<QueryResponse> {
        let response = self.submit(sql).await?;
        if !response.is_session_expired() {
            return Ok(response);
        }
        self.renew_token().await?;
        self.submit(sql).await
    }

    async fn poll_result(&self, url: &str) -> Result<QueryResponse> {
        self.http
            .get(format!("{}{}", self.base_url, url))
            .headers(self.auth_headers()?)
            .send()
            .await
            .context("Failed to poll statement result")?
            .error_for_status()
            .context("Snowflake rejected the result poll")?
            .json::<QueryResponse>()
            .await
            .context("Failed to parse statement result")
    }

    async fn submit(&mut self, sql: &str) -> Result<QueryResponse> {
        self.sequence_id += 1;
        let body = QueryRequest {
            sql_text: sql,
            async_exec: false,
            sequence_id: self.sequence_id,
            is_internal: false,
        };

        let response = self
            .http
            .post(format!("{}/queries/v1/query-request", self.base_url))
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .context("Failed to send statement to Snowflake")?
            .error_for_status()
            .context("Snowflake rejected the statement request")?;

        response
            .json::<QueryResponse>()
            .await
            .context("Failed to parse statement response")
    }

    /// Poll the result URL until the statement is no longer running
    ///
    /// A poll rejected for an expired token renews the session once and polls
    /// the same result again.
    async fn wait_for_result(&mut self, mut response: QueryResponse) -> Result<QueryResponse> {
        let mut delay = Duration::from_millis(500);

        while response.is_in_progress() {
            let url = response
                .data
                .as_ref()
                .and_then(|d| d.get_result_url.clone())
                .context("Running statement did not return a result URL")?;

            if let Some(query_id) = response.data.as_ref().and_then(|d| d.query_id.as_deref()) {
                tracing::debug!("Query {} still running, polling in {:?}", query_id, delay);
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(MAX_POLL_DELAY);

            response = self.poll_result(&url).await?;
            if response.is_session_expired() {
                self.renew_token().await?;
                response = self.poll_result(&url).await?;
            }
        }

        Ok(response)
    }

    /// Download the remaining row chunks of a large result
    async fn fetch_chunks(&self, data: &QueryData) -> Result<Vec<Vec<Value>>> {
        let headers = data.chunk_download_headers();
        let mut rows = Vec::new();
        for (idx, chunk) in data.chunks.iter().enumerate() {
            let mut request = self.http.get(&chunk.url);
            for (name, value) in &headers {
                request = request.header(name.as_str(), value.as_str());
            }
            let body = request
                .send()
                .await
                .with_context(|| format!("Failed to download result chunk {}", idx + 1))?
                .error_for_status()
                .with_context(|| format!("Result chunk {} request was rejected", idx + 1))?
                .text()
                .await
                .with_context(|| format!("Failed to read result chunk {}", idx + 1))?;

            // Chunks are comma-separated row arrays without the outer brackets
            let chunk_rows: Vec<Vec<Value>> = serde_json::from_str(&format!("[{}]", body))
                .with_context(|| format!("Failed to parse result chunk {}", idx + 1))?;
            rows.extend(chunk_rows);
        }
        Ok(rows)
    }
}

#[async_trait]
impl WarehouseSession for SnowflakeSession {
    async fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let submitted = self.submit_with_renewal(sql).await?;
        let response = self.wait_for_result(submitted).await?;

        if !response.success {
            bail!("{}", response.error_message());
        }

        let data = response.data.unwrap_or_default();
        let mut rows = data.rowset.clone();
        if !data.chunks.is_empty() {
            rows.extend(self.fetch_chunks(&data).await?);
        }

        Ok(QueryResult::new(data.columns(), rows_to_text(rows)))
    }

    async fn close(&mut self) -> Result<()> {
        self.http
            .post(format!("{}/session", self.base_url))
            .query(&[("delete", "true")])
            .headers(self.auth_headers()?)
            .send()
            .await
            .context("Failed to close Snowflake session")?
            .error_for_status()
            .context("Snowflake rejected the logout request")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Local HTTP endpoint answering each request with the next canned JSON body
    ///
    /// Returns the base URL and the log of received requests (head and body).
    async fn stub_server(replies: Vec<&'static str>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let replies = Arc::new(Mutex::new(VecDeque::from(replies)));
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = received.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let replies = replies.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let mut reader = BufReader::new(stream);
                    loop {
                        let mut head = String::new();
                        let mut content_length = 0;
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).await.unwrap() == 0 {
                                return;
                            }
                            if line == "\r\n" {
                                break;
                            }
                            if let Some(len) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                                content_length = len.trim().parse().unwrap();
                            }
                            head.push_str(&line);
                        }
                        let mut body = vec![0; content_length];
                        reader.read_exact(&mut body).await.unwrap();
                        log.lock()
                            .unwrap()
                            .push(format!("{}{}", head, String::from_utf8_lossy(&body)));

                        let reply = replies.lock().unwrap().pop_front().unwrap_or("{}");
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                            reply.len(),
                            reply
                        );
                        reader.get_mut().write_all(response.as_bytes()).await.unwrap();
                    }
                });
            }
        });

        (base_url, received)
    }

    fn session_at(base_url: String, master_token: Option<&str>) -> SnowflakeSession {
        SnowflakeSession {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            base_url,
            token: "old-token".into(),
            master_token: master_token.map(str::to_string),
            sequence_id: 0,
        }
    }

    const EXPIRED: &str = r#"{"data": null, "code": "390112",
        "message": "Your session has expired. Please login again.", "success": false}"#;
    const RENEWED: &str = r#"{"data": {"sessionToken": "new-token", "masterToken": "new-master",
        "validityInSecondsST": 3600}, "success": true}"#;
    const ONE_ROW: &str = r#"{"data": {"rowtype": [{"name": "X"}], "rowset": [["1"]]},
        "success": true}"#;

    #[tokio::test]
    async fn test_expired_token_is_renewed_and_statement_resubmitted() {
        let (base_url, received) = stub_server(vec![EXPIRED, RENEWED, ONE_ROW]).await;
        let mut session = session_at(base_url, Some("master"));

        let result = session.execute("SELECT 1").await.unwrap();
        assert_eq!(result.single_value().unwrap(), Some("1"));
        assert_eq!(session.token, "new-token");
        assert_eq!(session.master_token.as_deref(), Some("new-master"));

        let requests = received.lock().unwrap().clone();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].starts_with("POST /queries/v1/query-request"));
        assert!(requests[1].starts_with("POST /session/token-request"));
        assert!(requests[1].contains("Snowflake Token=\"master\""));
        assert!(requests[1].contains(r#""oldSessionToken":"old-token""#));
        assert!(requests[1].contains(r#""requestType":"RENEW""#));
        assert!(requests[2].starts_with("POST /queries/v1/query-request"));
        assert!(requests[2].contains("Snowflake Token=\"new-token\""));
    }

    #[tokio::test]
    async fn test_expired_token_while_polling_keeps_polling_same_query() {
        let running = r#"{"data": {"getResultUrl": "/queries/q1/result", "queryId": "q1"},
            "code": "333334", "message": "Asynchronous execution in progress.", "success": true}"#;
        let (base_url, received) =
            stub_server(vec![running, EXPIRED, RENEWED, ONE_ROW]).await;
        let mut session = session_at(base_url, Some("master"));

        let result = session.execute("SELECT 1").await.unwrap();
        assert_eq!(result.single_value().unwrap(), Some("1"));

        let requests = received.lock().unwrap().clone();
        assert_eq!(requests.len(), 4);
        assert!(requests[1].starts_with("GET /queries/q1/result"));
        assert!(requests[2].starts_with("POST /session/token-request"));
        assert!(requests[3].starts_with("GET /queries/q1/result"));
        let submissions = requests
            .iter()
            .filter(|r| r.starts_with("POST /queries/v1/query-request"))
            .count();
        assert_eq!(submissions, 1);
    }

    #[tokio::test]
    async fn test_expired_token_without_master_token_fails() {
        let (base_url, _) = stub_server(vec![EXPIRED]).await;
        let mut session = session_at(base_url, None);

        let err = session.execute("SELECT 1").await.unwrap_err();
        assert!(format!("{:#}", err).contains("no master token"));
    }

    #[test]
    fn test_login_data_keeps_master_token() {
        let login: LoginResponse = serde_json::from_str(
            r#"{"data": {"token": "t", "masterToken": "m"}, "success": true}"#,
        )
        .unwrap();
        assert_eq!(login.data.unwrap().master_token.as_deref(), Some("m"));
    }

    #[test]
    fn test_chunk_headers_fall_back_to_qrmk() {
        let data: QueryData = serde_json::from_str(
            r#"{"chunks": [{"url": "https://s3/chunk0"}], "qrmk": "a2V5"}"#,
        )
        .unwrap();
        let headers = data.chunk_download_headers();
        assert!(headers.contains(&(SSE_C_ALGORITHM_HEADER.to_string(), "AES256".to_string())));
        assert!(headers.contains(&(SSE_C_KEY_HEADER.to_string(), "a2V5".to_string())));

        let data: QueryData = serde_json::from_str(
            r#"{"chunkHeaders": {"x-amz-server-side-encryption-customer-key": "k"}, "qrmk": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(
            data.chunk_download_headers(),
            vec![(SSE_C_KEY_HEADER.to_string(), "k".to_string())]
        );
    }

    #[test]
    fn test_client_identity_is_this_crate() {
        assert_eq!(CLIENT_APP_ID, "snow2gcp");
        assert!(!CLIENT_APP_VERSION.is_empty());
    }

    fn parse_query_response(body: &str) -> Result<QueryResult> {
        let response: QueryResponse = serde_json::from_str(body)?;
        if !response.success {
            bail!("{}", response.error_message());
        }
        let data = response.data.unwrap_or_default();
        Ok(QueryResult::new(data.columns(), rows_to_text(data.rowset)))
    }

    #[test]
    fn test_account_host() {
        assert_eq!(account_host("xy12345"), "xy12345.snowflakecomputing.com");
        assert_eq!(
            account_host("myorg-myaccount"),
            "myorg-myaccount.snowflakecomputing.com"
        );
        assert_eq!(
            account_host("xy12345.us-east-1.snowflakecomputing.com"),
            "xy12345.us-east-1.snowflakecomputing.com"
        );
    }

    #[test]
    fn test_account_name() {
        assert_eq!(account_name("xy12345.us-east-1"), "XY12345");
        assert_eq!(account_name("https://org-acct.snowflakecomputing.com"), "ORG-ACCT");
    }

    #[test]
    fn test_login_request_field_names() {
        let body = LoginRequest {
            data: LoginRequestData {
                client_app_id: CLIENT_APP_ID,
                client_app_version: CLIENT_APP_VERSION,
                account_name: "ACCT".into(),
                login_name: "user",
                password: "secret",
                session_parameters: HashMap::from([("QUERY_RESULT_FORMAT", "JSON")]),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["data"]["ACCOUNT_NAME"], "ACCT");
        assert_eq!(json["data"]["LOGIN_NAME"], "user");
        assert_eq!(json["data"]["SESSION_PARAMETERS"]["QUERY_RESULT_FORMAT"], "JSON");
    }

    #[test]
    fn test_query_request_field_names() {
        let body = QueryRequest {
            sql_text: "SELECT 1",
            async_exec: false,
            sequence_id: 3,
            is_internal: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sqlText"], "SELECT 1");
        assert_eq!(json["sequenceId"], 3);
        assert_eq!(json["asyncExec"], false);
    }

    #[test]
    fn test_parse_query_response_rows() {
        let body = r#"{
            "data": {
                "rowtype": [{"name": "SELECT_CLAUSE", "type": "text"}],
                "rowset": [["ID,\nCONVERT_TIMEZONE('UTC', TS)::TIMESTAMP as TS"]],
                "total": 1,
                "queryId": "01b2"
            },
            "code": null,
            "message": null,
            "success": true
        }"#;
        let result = parse_query_response(body).unwrap();
        assert_eq!(result.columns, vec!["SELECT_CLAUSE"]);
        assert_eq!(
            result.single_value().unwrap(),
            Some("ID,\nCONVERT_TIMEZONE('UTC', TS)::TIMESTAMP as TS")
        );
    }

    #[test]
    fn test_parse_query_response_nulls_and_numbers() {
        let body = r#"{
            "data": {"rowtype": [{"name": "a"}, {"name": "b"}], "rowset": [[null, 5]]},
            "success": true
        }"#;
        let result = parse_query_response(body).unwrap();
        assert_eq!(result.rows, vec![vec![None, Some("5".to_string())]]);
    }

    #[test]
    fn test_parse_query_response_error() {
        let body = r#"{
            "data": null,
            "code": "002003",
            "message": "SQL compilation error: Object 'X' does not exist or not authorized.",
            "success": false
        }"#;
        let err = parse_query_response(body).unwrap_err().to_string();
        assert!(err.contains("does not exist"));
        assert!(err.contains("002003"));
    }

    #[test]
    fn test_in_progress_detection() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"data": {"getResultUrl": "/queries/01b2/result", "queryId": "01b2"},
                "code": "333334", "message": "Asynchronous execution in progress.", "success": true}"#,
        )
        .unwrap();
        assert!(response.is_in_progress());
    }

    #[test]
    fn test_login_error_messages() {
        let response = LoginResponse {
            data: None,
            code: Some("390100".into()),
            message: Some("Incorrect username or password was specified.".into()),
            success: false,
        };
        assert!(login_error(&response).to_string().contains("Authentication failed"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_connect_with_env_credentials() {
        let credentials = SnowflakeCredentials::from_env()
            .expect("SNOWFLAKE_* variables must be set for integration tests");
        let mut session = connect(&credentials).await.unwrap();
        let result = session.execute("SELECT CURRENT_VERSION()").await.unwrap();
        assert_eq!(result.rows.len(), 1);
        session.close().await.unwrap();
    }
}
