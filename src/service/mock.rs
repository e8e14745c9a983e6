//! Scripted query service for testing.
//!
//! Plays back a fixed sequence of poll outcomes and result pages, and records
//! every call so tests can assert on the protocol itself.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{QueryHandle, QueryService, QueryStatus, QuerySubmission, ResultPage, Row, ServiceResult};
use crate::error::ServiceError;

/// Number of calls made against a `ScriptedQueryService`, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceCalls {
    pub submit: usize,
    pub poll: usize,
    pub fetch: usize,
    pub cancel: usize,
}

/// A fake query service driven by a script.
///
/// Poll outcomes are consumed in order; once the script runs out the last
/// outcome repeats, so a terminal state stays terminal. Pages are keyed by the
/// continuation token that requests them (`None` for the first page).
#[derive(Debug, Default)]
pub struct ScriptedQueryService {
    submit_error: Option<ServiceError>,
    polls: Mutex<VecDeque<ServiceResult<QueryStatus>>>,
    last_poll: Mutex<Option<ServiceResult<QueryStatus>>>,
    pages: HashMap<Option<String>, ServiceResult<ResultPage>>,
    submissions: Mutex<Vec<QuerySubmission>>,
    fetch_tokens: Mutex<Vec<Option<String>>>,
    cancelled: Mutex<bool>,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedQueryService {
    /// Creates a service whose queries succeed immediately with no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service that succeeds on the first poll and returns a single
    /// page made of `header` followed by `rows`.
    pub fn succeeding(header: Vec<&str>, rows: Vec<Row>) -> Self {
        let mut page = vec![header.into_iter().map(|c| Some(c.to_string())).collect()];
        page.extend(rows);
        Self::new()
            .with_status(QueryStatus::succeeded())
            .with_pages(vec![ResultPage::last(page)])
    }

    /// Appends a poll outcome to the script.
    pub fn with_status(self, status: QueryStatus) -> Self {
        lock(&self.polls).push_back(Ok(status));
        self
    }

    /// Appends `count` RUNNING poll outcomes to the script.
    pub fn with_running(self, count: usize) -> Self {
        {
            let mut polls = lock(&self.polls);
            for _ in 0..count {
                polls.push_back(Ok(QueryStatus::running()));
            }
        }
        self
    }

    /// Appends a failing poll to the script.
    pub fn with_poll_error(self, error: ServiceError) -> Self {
        lock(&self.polls).push_back(Err(error));
        self
    }

    /// Registers a chain of pages. The first answers the initial fetch; each
    /// following page answers the token carried by the page before it.
    pub fn with_pages(mut self, pages: Vec<ResultPage>) -> Self {
        let mut token = None;
        for page in pages {
            let next = page.next_token.clone();
            self.pages.insert(token, Ok(page));
            token = next;
        }
        self
    }

    /// Makes the fetch for `token` fail.
    pub fn with_fetch_error(mut self, token: Option<&str>, error: ServiceError) -> Self {
        self.pages.insert(token.map(String::from), Err(error));
        self
    }

    /// Makes every submission fail.
    pub fn with_submit_error(mut self, error: ServiceError) -> Self {
        self.submit_error = Some(error);
        self
    }

    /// Returns how many times each operation was called.
    pub fn calls(&self) -> ServiceCalls {
        ServiceCalls {
            submit: self.submit_calls.load(Ordering::SeqCst),
            poll: self.poll_calls.load(Ordering::SeqCst),
            fetch: self.fetch_calls.load(Ordering::SeqCst),
            cancel: self.cancel_calls.load(Ordering::SeqCst),
        }
    }

    /// Returns every submission received, in order.
    pub fn submissions(&self) -> Vec<QuerySubmission> {
        lock(&self.submissions).clone()
    }

    /// Returns the continuation tokens fetches were made with, in order.
    pub fn fetch_tokens(&self) -> Vec<Option<String>> {
        lock(&self.fetch_tokens).clone()
    }
}

#[async_trait]
impl QueryService for ScriptedQueryService {
    async fn submit(&self, submission: &QuerySubmission) -> ServiceResult<QueryHandle> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = &self.submit_error {
            return Err(error.clone());
        }
        lock(&self.submissions).push(submission.clone());
        Ok(QueryHandle::new(format!("mock-query-{n}")))
    }

    async fn poll(&self, _handle: &QueryHandle) -> ServiceResult<QueryStatus> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);

        if *lock(&self.cancelled) {
            return Ok(QueryStatus::cancelled("Query cancelled by user"));
        }

        let mut last = lock(&self.last_poll);
        if let Some(next) = lock(&self.polls).pop_front() {
            *last = Some(next);
        }
        last.clone().unwrap_or_else(|| Ok(QueryStatus::succeeded()))
    }

    async fn fetch_page(
        &self,
        _handle: &QueryHandle,
        token: Option<&str>,
    ) -> ServiceResult<ResultPage> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let key = token.map(String::from);
        lock(&self.fetch_tokens).push(key.clone());

        match self.pages.get(&key) {
            Some(page) => page.clone(),
            None if key.is_none() => Ok(ResultPage::default()),
            None => Err(ServiceError::api(
                "InvalidRequestException",
                format!("Unknown continuation token: {}", token.unwrap_or_default()),
            )),
        }
    }

    async fn cancel(&self, _handle: &QueryHandle) -> ServiceResult<()> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.cancelled) = true;
        Ok(())
    }
}
