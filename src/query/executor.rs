//! Asynchronous query execution.
//!
//! Hides the submit / poll / fetch protocol of the query service behind one
//! call. The executor keeps no state between calls: each execution owns its
//! handle and result set, so one executor can be shared across tasks.
//!
//! Timing out client-side does not stop the query on the service. Use
//! [`AsyncQueryExecutor::cancel`] when that matters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{QueryError, Result, ServiceError, UNKNOWN_REASON};
use crate::query::ResultSet;
use crate::service::{QueryHandle, QueryService, QueryState, QueryStatus, QuerySubmission};

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of polls before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;

/// How long to wait for a submitted query to reach a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Minimum delay between successive polls.
    pub poll_interval: Duration,
    /// Upper bound on the number of polls.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    /// Rejects a zero interval or a zero attempt bound.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(QueryError::invalid_request("poll interval must be greater than zero"));
        }
        if self.max_attempts == 0 {
            return Err(QueryError::invalid_request("max attempts must be greater than zero"));
        }
        Ok(())
    }

    /// Upper bound on the time spent sleeping between polls, or `None` if
    /// it does not fit in a `Duration`.
    pub fn max_wait(&self) -> Option<Duration> {
        self.poll_interval
            .checked_mul(self.max_attempts.saturating_sub(1))
    }
}

/// A query that reached SUCCEEDED without its results being fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub handle: QueryHandle,
    /// Number of polls it took to observe SUCCEEDED.
    pub polls: u32,
}

/// Runs statements against a query service.
#[derive(Clone)]
pub struct AsyncQueryExecutor {
    service: Arc<dyn QueryService>,
}

impl AsyncQueryExecutor {
    /// Creates an executor over the given service.
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self { service }
    }

    /// Executes one statement to completion and returns all of its rows.
    ///
    /// `dataset` is `None` for statements that manage the namespace itself.
    pub async fn execute(
        &self,
        statement: &str,
        dataset: Option<&str>,
        output_location: &str,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Result<ResultSet> {
        let submission = QuerySubmission {
            statement: statement.to_string(),
            dataset: dataset.map(String::from),
            output_location: output_location.to_string(),
        };
        self.execute_submission(&submission, &PollPolicy::new(poll_interval, max_attempts))
            .await
    }

    /// Executes a prepared submission: submit, wait for SUCCEEDED, fetch all pages.
    pub async fn execute_submission(
        &self,
        submission: &QuerySubmission,
        policy: &PollPolicy,
    ) -> Result<ResultSet> {
        let start = Instant::now();
        let completion = self.run_to_completion(submission, policy).await?;
        let result = self.fetch_all(&completion.handle).await?;

        info!(
            handle = %completion.handle,
            rows = result.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query results retrieved"
        );
        Ok(result)
    }

    /// Submits and waits for SUCCEEDED without fetching anything.
    ///
    /// Used for definition statements, where completion itself is the result.
    pub async fn run_to_completion(
        &self,
        submission: &QuerySubmission,
        policy: &PollPolicy,
    ) -> Result<Completion> {
        validate_submission(submission)?;
        policy.validate()?;

        let handle = self
            .service
            .submit(submission)
            .await
            .map_err(QueryError::SubmissionTransport)?;
        info!(
            handle = %handle,
            dataset = submission.dataset.as_deref().unwrap_or("-"),
            "Query submitted"
        );

        let polls = self.wait_for(&handle, policy).await?;
        Ok(Completion { handle, polls })
    }

    /// Polls `handle` until it reaches a terminal state or the policy runs out.
    ///
    /// Returns the number of polls made. Safe to call again after a
    /// `PollTimeout` or `PollTransport` error; nothing is resubmitted.
    pub async fn wait_for(&self, handle: &QueryHandle, policy: &PollPolicy) -> Result<u32> {
        policy.validate()?;

        for attempt in 1..=policy.max_attempts {
            let status = self.status(handle).await?;
            debug!(handle = %handle, attempt, state = %status.state, "Polled query");

            match status.state {
                QueryState::Running => {
                    if attempt < policy.max_attempts {
                        tokio::time::sleep(policy.poll_interval).await;
                    }
                }
                QueryState::Succeeded => {
                    info!(handle = %handle, polls = attempt, "Query succeeded");
                    return Ok(attempt);
                }
                QueryState::Failed => {
                    let reason = status.reason.unwrap_or_else(|| UNKNOWN_REASON.to_string());
                    warn!(handle = %handle, %reason, "Query failed");
                    return Err(QueryError::QueryFailed {
                        handle: handle.clone(),
                        reason,
                    });
                }
                QueryState::Cancelled => {
                    let reason = status.reason.unwrap_or_else(|| UNKNOWN_REASON.to_string());
                    warn!(handle = %handle, %reason, "Query cancelled");
                    return Err(QueryError::QueryCancelled {
                        handle: handle.clone(),
                        reason,
                    });
                }
            }
        }

        warn!(
            handle = %handle,
            attempts = policy.max_attempts,
            "Query still running, giving up"
        );
        Err(QueryError::PollTimeout {
            handle: handle.clone(),
            attempts: policy.max_attempts,
        })
    }

    /// Reads the current state of a query once.
    pub async fn status(&self, handle: &QueryHandle) -> Result<QueryStatus> {
        self.service
            .poll(handle)
            .await
            .map_err(|source| QueryError::PollTransport {
                handle: handle.clone(),
                source,
            })
    }

    /// Fetches every result page of a succeeded query, in token order.
    pub async fn fetch_all(&self, handle: &QueryHandle) -> Result<ResultSet> {
        let mut result = ResultSet::new();
        let mut token: Option<String> = None;
        let mut first_page = true;

        loop {
            let page = self
                .service
                .fetch_page(handle, token.as_deref())
                .await
                .map_err(|source| QueryError::FetchTransport {
                    handle: handle.clone(),
                    source,
                })?;
            debug!(handle = %handle, rows = page.rows.len(), first_page, "Fetched result page");

            result.push_page(page.rows, first_page);
            first_page = false;

            match page.next_token {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(QueryError::FetchTransport {
                        handle: handle.clone(),
                        source: ServiceError::decode(format!(
                            "Service repeated continuation token {next}"
                        )),
                    });
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(result)
    }

    /// Asks the service to stop a query. Never called implicitly.
    pub async fn cancel(&self, handle: &QueryHandle) -> Result<()> {
        self.service
            .cancel(handle)
            .await
            .map_err(|source| QueryError::PollTransport {
                handle: handle.clone(),
                source,
            })?;
        info!(handle = %handle, "Cancellation requested");
        Ok(())
    }
}

fn validate_submission(submission: &QuerySubmission) -> Result<()> {
    if submission.statement.trim().is_empty() {
        return Err(QueryError::invalid_request("statement must not be empty"));
    }
    if submission.output_location.trim().is_empty() {
        return Err(QueryError::invalid_request("output location must not be empty"));
    }
    if submission.dataset.as_deref().is_some_and(|d| d.trim().is_empty()) {
        return Err(QueryError::invalid_request("dataset must not be blank"));
    }
    Ok(())
}
