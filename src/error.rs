//! Error types for ran-query.
//!
//! `QueryError` keeps every phase of the submit/poll/fetch protocol distinct so
//! a caller can tell "never started" from "ran and failed" from "ran, succeeded,
//! but result retrieval broke". `ServiceError` is what a `QueryService`
//! implementation reports; the executor wraps it in the kind matching the phase.

use thiserror::Error;

use crate::service::QueryHandle;

/// Reason text used when the service reports a terminal failure without one.
pub const UNKNOWN_REASON: &str = "Unknown error";

/// Transport-level failure reported by a query service implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request never produced a usable response (connect, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with an error payload.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    /// The response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Creates an HTTP error with the given message.
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Creates an API error from a service error code and message.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// Main error type for query execution.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Submission failed in transport; nothing was started, or its state is unknown.
    #[error("Submission failed: {0}")]
    SubmissionTransport(#[source] ServiceError),

    /// Checking the state of a submitted query failed; its real state is unknown.
    #[error("Polling query {handle} failed: {source}")]
    PollTransport {
        handle: QueryHandle,
        #[source]
        source: ServiceError,
    },

    /// The service reported the query as FAILED.
    #[error("Query {handle} failed: {reason}")]
    QueryFailed { handle: QueryHandle, reason: String },

    /// The service reported the query as CANCELLED.
    #[error("Query {handle} was cancelled: {reason}")]
    QueryCancelled { handle: QueryHandle, reason: String },

    /// The query was still running after the last allowed poll.
    #[error("Query {handle} still running after {attempts} polls")]
    PollTimeout { handle: QueryHandle, attempts: u32 },

    /// The query succeeded but a result page could not be retrieved.
    #[error("Fetching results of query {handle} failed: {source}")]
    FetchTransport {
        handle: QueryHandle,
        #[source]
        source: ServiceError,
    },

    /// Inputs rejected before anything was sent to the service.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Creates an invalid request error with the given message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::SubmissionTransport(_) => "Submission Error",
            Self::PollTransport { .. } => "Poll Error",
            Self::QueryFailed { .. } => "Query Failed",
            Self::QueryCancelled { .. } => "Query Cancelled",
            Self::PollTimeout { .. } => "Poll Timeout",
            Self::FetchTransport { .. } => "Fetch Error",
            Self::InvalidRequest(_) => "Invalid Request",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the handle of the query this error concerns, if one was issued.
    pub fn handle(&self) -> Option<&QueryHandle> {
        match self {
            Self::PollTransport { handle, .. }
            | Self::QueryFailed { handle, .. }
            | Self::QueryCancelled { handle, .. }
            | Self::PollTimeout { handle, .. }
            | Self::FetchTransport { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Returns true if polling the same handle again may still yield a result.
    ///
    /// Resubmitting is never implied: the query may already be running.
    pub fn is_poll_retryable(&self) -> bool {
        matches!(self, Self::PollTransport { .. } | Self::PollTimeout { .. })
    }
}

/// Result type alias using QueryError.
pub type Result<T> = std::result::Result<T, QueryError>;
