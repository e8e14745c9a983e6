//! HTTP client for the managed query service.
//!
//! Speaks the service's JSON 1.1 RPC protocol: every operation is a POST to
//! the endpoint with the operation named in the `X-Amz-Target` header.
//! Requests are not signed in-process; point `endpoint` at a signing proxy or
//! a local emulator, optionally with a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{QueryHandle, QueryService, QueryState, QueryStatus, QuerySubmission, ResultPage, ServiceResult};
use crate::error::{QueryError, Result, ServiceError};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Largest page the service will return.
pub const MAX_PAGE_SIZE: u32 = 1000;

const TARGET_PREFIX: &str = "AmazonAthena";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Query service client configuration.
#[derive(Debug, Clone)]
pub struct AthenaConfig {
    /// Base URL requests are POSTed to.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Rows requested per result page.
    pub page_size: u32,
    /// Optional bearer token for the signing proxy.
    pub auth_token: Option<String>,
}

impl AthenaConfig {
    /// Creates a new config for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: MAX_PAGE_SIZE,
            auth_token: None,
        }
    }

    /// Returns the public endpoint for a region.
    pub fn regional_endpoint(region: &str) -> String {
        format!("https://athena.{region}.amazonaws.com")
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the page size, clamped to what the service accepts.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Sets the bearer token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// Query service client.
#[derive(Debug, Clone)]
pub struct AthenaClient {
    config: AthenaConfig,
    client: Client,
}

impl AthenaClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: AthenaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QueryError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Returns the configuration this client was built with.
    pub fn config(&self) -> &AthenaConfig {
        &self.config
    }

    /// Sends one RPC call and decodes its response.
    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> ServiceResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .json(request);

        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::http(format!("{operation}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::http(format!("{operation}: failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ServiceError::decode(format!("{operation}: {e}")))
    }

    /// Parses an API error response.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> ServiceError {
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(body) {
            let code = error
                .error_type
                .as_deref()
                .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
                .unwrap_or_else(|| status.as_u16().to_string());
            let message = error
                .message
                .or(error.message_upper)
                .unwrap_or_else(|| status.to_string());
            return ServiceError::api(code, message);
        }

        ServiceError::api(status.as_u16().to_string(), body.trim().to_string())
    }
}

#[async_trait]
impl QueryService for AthenaClient {
    async fn submit(&self, submission: &QuerySubmission) -> ServiceResult<QueryHandle> {
        let request = StartQueryExecutionRequest {
            query_string: &submission.statement,
            query_execution_context: submission
                .dataset
                .as_deref()
                .map(|database| QueryExecutionContext { database }),
            result_configuration: ResultConfiguration {
                output_location: &submission.output_location,
            },
        };

        let response: StartQueryExecutionResponse =
            self.call("StartQueryExecution", &request).await?;
        Ok(QueryHandle::new(response.query_execution_id))
    }

    async fn poll(&self, handle: &QueryHandle) -> ServiceResult<QueryStatus> {
        let request = QueryExecutionIdRequest {
            query_execution_id: handle.as_str(),
        };
        let response: GetQueryExecutionResponse =
            self.call("GetQueryExecution", &request).await?;

        let status = response.query_execution.status;
        let state = QueryState::parse(&status.state)
            .ok_or_else(|| ServiceError::decode(format!("Unknown query state '{}'", status.state)))?;

        Ok(QueryStatus {
            state,
            reason: status.state_change_reason,
        })
    }

    async fn fetch_page(
        &self,
        handle: &QueryHandle,
        token: Option<&str>,
    ) -> ServiceResult<ResultPage> {
        let request = GetQueryResultsRequest {
            query_execution_id: handle.as_str(),
            next_token: token,
            max_results: self.config.page_size,
        };
        let response: GetQueryResultsResponse = self.call("GetQueryResults", &request).await?;

        let rows = response
            .result_set
            .rows
            .into_iter()
            .map(|row| row.data.into_iter().map(|d| d.var_char_value).collect())
            .collect();

        Ok(ResultPage {
            rows,
            next_token: response.next_token,
        })
    }

    async fn cancel(&self, handle: &QueryHandle) -> ServiceResult<()> {
        let request = QueryExecutionIdRequest {
            query_execution_id: handle.as_str(),
        };
        let _: serde_json::Value = self.call("StopQueryExecution", &request).await?;
        Ok(())
    }
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionRequest<'a> {
    query_string: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_execution_context: Option<QueryExecutionContext<'a>>,
    result_configuration: ResultConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionContext<'a> {
    database: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResultConfiguration<'a> {
    output_location: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionResponse {
    query_execution_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionIdRequest<'a> {
    query_execution_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionResponse {
    query_execution: QueryExecution,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: ExecutionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionStatus {
    state: String,
    state_change_reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsRequest<'a> {
    query_execution_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsResponse {
    result_set: WireResultSet,
    next_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireResultSet {
    #[serde(default)]
    rows: Vec<WireRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireRow {
    #[serde(default)]
    data: Vec<Datum>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datum {
    var_char_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}
