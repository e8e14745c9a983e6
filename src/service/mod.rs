//! Query service abstraction for ran-query.
//!
//! Provides a trait-based interface to the external query service, allowing
//! the HTTP client and the scripted fake to be used interchangeably.

pub mod athena;
mod mock;

pub use athena::{AthenaClient, AthenaConfig};
pub use mock::{ScriptedQueryService, ServiceCalls};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Result type for query service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// A single result row. Values arrive as text; `None` is SQL NULL.
pub type Row = Vec<Option<String>>;

/// Inputs for one query submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySubmission {
    /// Query text, sent verbatim.
    pub statement: String,

    /// Namespace the statement runs in. `None` omits the context entirely,
    /// which is what namespace-management statements need.
    pub dataset: Option<String>,

    /// Where the service spools results.
    pub output_location: String,
}

impl QuerySubmission {
    /// Creates a submission that runs inside the given dataset.
    pub fn new(
        statement: impl Into<String>,
        dataset: impl Into<String>,
        output_location: impl Into<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            dataset: Some(dataset.into()),
            output_location: output_location.into(),
        }
    }

    /// Creates a submission with no dataset context.
    pub fn without_dataset(
        statement: impl Into<String>,
        output_location: impl Into<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            dataset: None,
            output_location: output_location.into(),
        }
    }
}

/// Opaque identifier the service assigns to a submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution state as observed from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryState {
    /// The only non-terminal state. Queued queries are reported as running.
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    /// Parses the service's wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "QUEUED" | "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns true if no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatus {
    pub state: QueryState,

    /// Service-provided explanation, present on FAILED and CANCELLED.
    pub reason: Option<String>,
}

impl QueryStatus {
    pub fn running() -> Self {
        Self {
            state: QueryState::Running,
            reason: None,
        }
    }

    pub fn succeeded() -> Self {
        Self {
            state: QueryState::Succeeded,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: QueryState::Failed,
            reason: Some(reason.into()),
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            state: QueryState::Cancelled,
            reason: Some(reason.into()),
        }
    }
}

/// One batch of result rows plus the cursor for the next batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage {
    pub rows: Vec<Row>,
    pub next_token: Option<String>,
}

impl ResultPage {
    /// Creates a final page (no continuation token).
    pub fn last(rows: Vec<Row>) -> Self {
        Self {
            rows,
            next_token: None,
        }
    }

    /// Creates a page followed by another one.
    pub fn with_next(rows: Vec<Row>, token: impl Into<String>) -> Self {
        Self {
            rows,
            next_token: Some(token.into()),
        }
    }
}

/// Operations the executor needs from the external query service.
///
/// Implementations report transport problems as `ServiceError`; the executor
/// decides which phase of the protocol the failure belongs to.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Starts asynchronous execution and returns the service's handle.
    async fn submit(&self, submission: &QuerySubmission) -> ServiceResult<QueryHandle>;

    /// Reads the current state of a submitted query.
    async fn poll(&self, handle: &QueryHandle) -> ServiceResult<QueryStatus>;

    /// Fetches one page of results. `token` is `None` for the first page.
    async fn fetch_page(
        &self,
        handle: &QueryHandle,
        token: Option<&str>,
    ) -> ServiceResult<ResultPage>;

    /// Asks the service to stop a running query.
    async fn cancel(&self, handle: &QueryHandle) -> ServiceResult<()>;
}
