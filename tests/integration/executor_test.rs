//! Executor protocol integration tests.
//!
//! Drives the submit / poll / fetch protocol against the scripted service
//! and asserts on both the returned rows and the calls that were made.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use ran_query::error::{QueryError, ServiceError};
use ran_query::query::{AsyncQueryExecutor, PollPolicy};
use ran_query::service::{
    QueryHandle, QueryService, QueryState, QueryStatus, QuerySubmission, ResultPage, Row,
    ScriptedQueryService, ServiceCalls,
};

const DATASET: &str = "ran_copilot";
const OUTPUT: &str = "s3://ran-copilot-data-lake/athena-query-results/";
const INTERVAL: Duration = Duration::from_millis(1);

fn row(values: &[&str]) -> Row {
    values.iter().map(|v| Some(v.to_string())).collect()
}

fn executor(service: &Arc<ScriptedQueryService>) -> AsyncQueryExecutor {
    AsyncQueryExecutor::new(service.clone())
}

/// Scenario: success, single page
/// Given a statement matching 3 rows
/// And the service reports SUCCEEDED on the second poll
/// When execute is called
/// Then exactly those 3 rows are returned in order
#[tokio::test]
async fn test_success_single_page() {
    let service = Arc::new(
        ScriptedQueryService::new()
            .with_running(1)
            .with_status(QueryStatus::succeeded())
            .with_pages(vec![ResultPage::last(vec![
                row(&["cell_id", "network_load"]),
                row(&["C-101", "0.93"]),
                row(&["C-102", "0.88"]),
                row(&["C-103", "0.97"]),
            ])]),
    );

    let result = executor(&service)
        .execute(
            "SELECT cell_id, network_load FROM analytics_ue_metrics WHERE network_load > 0.85",
            Some(DATASET),
            OUTPUT,
            INTERVAL,
            10,
        )
        .await
        .unwrap();

    assert_eq!(
        result.rows,
        vec![
            row(&["C-101", "0.93"]),
            row(&["C-102", "0.88"]),
            row(&["C-103", "0.97"]),
        ]
    );
    assert_eq!(result.columns, vec!["cell_id", "network_load"]);
    assert_eq!(
        service.calls(),
        ServiceCalls {
            submit: 1,
            poll: 2,
            fetch: 1,
            cancel: 0,
        }
    );
}

/// Scenario: success, two pages
/// Given page 1 holds the header, 2 rows and token "tok1"
/// And page 2 holds 2 more rows and no token
/// When execute is called
/// Then 4 rows are returned in page order and the header is dropped once
#[tokio::test]
async fn test_success_two_pages() {
    let service = Arc::new(ScriptedQueryService::new().with_pages(vec![
        ResultPage::with_next(
            vec![row(&["alarm_name"]), row(&["LINK_DOWN"]), row(&["HIGH_TEMP"])],
            "tok1",
        ),
        ResultPage::last(vec![row(&["VSWR"]), row(&["SYNC_LOSS"])]),
    ]));

    let result = executor(&service)
        .execute("SELECT alarm_name FROM analytics_alarms", Some(DATASET), OUTPUT, INTERVAL, 3)
        .await
        .unwrap();

    assert_eq!(
        result.rows,
        vec![
            row(&["LINK_DOWN"]),
            row(&["HIGH_TEMP"]),
            row(&["VSWR"]),
            row(&["SYNC_LOSS"]),
        ]
    );
    assert!(!result.rows.contains(&row(&["alarm_name"])));
    assert_eq!(service.fetch_tokens(), vec![None, Some("tok1".to_string())]);
}

/// Scenario: a later page echoes the column names
/// Given page 2 starts with a row equal to the header
/// When execute is called
/// Then that row is kept, because only the first page carries a header
#[tokio::test]
async fn test_header_dropped_only_on_first_page() {
    let service = Arc::new(ScriptedQueryService::new().with_pages(vec![
        ResultPage::with_next(vec![row(&["cell_id"])], "tok1"),
        ResultPage::last(vec![row(&["cell_id"]), row(&["C-9"])]),
    ]));

    let result = executor(&service)
        .execute("SELECT cell_id FROM m", Some(DATASET), OUTPUT, INTERVAL, 3)
        .await
        .unwrap();

    assert_eq!(result.rows, vec![row(&["cell_id"]), row(&["C-9"])]);
}

/// Scenario: many pages
/// Given five chained pages
/// When execute is called
/// Then pages are requested strictly in token order and rows keep that order
#[tokio::test]
async fn test_many_pages_preserve_order() {
    let mut pages = vec![ResultPage::with_next(vec![row(&["n"]), row(&["0"])], "t1")];
    for i in 1..4 {
        pages.push(ResultPage::with_next(vec![row(&[i.to_string().as_str()])], format!("t{}", i + 1)));
    }
    pages.push(ResultPage::last(vec![row(&["4"])]));
    let service = Arc::new(ScriptedQueryService::new().with_pages(pages));

    let result = executor(&service)
        .execute("SELECT n FROM seq", Some(DATASET), OUTPUT, INTERVAL, 3)
        .await
        .unwrap();

    let values: Vec<&str> = (0..result.len()).map(|i| result.value(i, "n").unwrap()).collect();
    assert_eq!(values, vec!["0", "1", "2", "3", "4"]);
    assert_eq!(
        service.fetch_tokens(),
        vec![
            None,
            Some("t1".to_string()),
            Some("t2".to_string()),
            Some("t3".to_string()),
            Some("t4".to_string()),
        ]
    );
}

/// Scenario: zero-row result
/// Given a query that succeeds but matches nothing
/// When execute is called
/// Then an empty result set is returned, not an error
#[tokio::test]
async fn test_zero_rows_is_empty_success() {
    let service = Arc::new(
        ScriptedQueryService::new()
            .with_pages(vec![ResultPage::last(vec![row(&["cell_id", "rsrp"])])]),
    );

    let result = executor(&service)
        .execute("SELECT cell_id, rsrp FROM m WHERE rsrp < -200", Some(DATASET), OUTPUT, INTERVAL, 3)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.columns, vec!["cell_id", "rsrp"]);
}

/// Scenario: zero-row result with no header at all
#[tokio::test]
async fn test_zero_rows_without_header() {
    let service = Arc::new(ScriptedQueryService::new());

    let result = executor(&service)
        .execute("SELECT 1 WHERE false", Some(DATASET), OUTPUT, INTERVAL, 3)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert!(result.columns.is_empty());
}

/// Scenario: query failure
/// Given the service reports FAILED with a syntax error on the first poll
/// When execute is called
/// Then QueryFailed carries the reason verbatim and nothing is fetched
#[tokio::test]
async fn test_query_failure() {
    let reason = "SYNTAX_ERROR: line 1:8: Column 'rsrq' cannot be resolved";
    let service = Arc::new(ScriptedQueryService::new().with_status(QueryStatus::failed(reason)));

    let err = executor(&service)
        .execute("SELECT rsrq FROM m", Some(DATASET), OUTPUT, INTERVAL, 5)
        .await
        .unwrap_err();

    match err {
        QueryError::QueryFailed { reason: got, handle } => {
            assert_eq!(got, reason);
            assert_eq!(handle.as_str(), "mock-query-1");
        }
        other => panic!("Expected QueryFailed, got {:?}", other),
    }
    assert_eq!(service.calls().poll, 1);
    assert_eq!(service.calls().fetch, 0);
}

/// Scenario: timeout
/// Given max_attempts = 3 and the query RUNNING on every poll
/// When execute is called
/// Then PollTimeout is raised after exactly 3 polls, 1 submit and 0 fetches
#[tokio::test]
async fn test_timeout() {
    let service = Arc::new(ScriptedQueryService::new().with_running(10));

    let err = executor(&service)
        .execute("SELECT * FROM big", Some(DATASET), OUTPUT, INTERVAL, 3)
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::PollTimeout { attempts: 3, .. }));
    assert_eq!(
        service.calls(),
        ServiceCalls {
            submit: 1,
            poll: 3,
            fetch: 0,
            cancel: 0,
        }
    );
}

/// Scenario: the poll interval is honored
/// Given an interval of 20ms and SUCCEEDED on the third poll
/// When execute is called
/// Then at least two intervals elapse
#[tokio::test]
async fn test_poll_interval_between_attempts() {
    let service = Arc::new(
        ScriptedQueryService::new()
            .with_running(2)
            .with_status(QueryStatus::succeeded()),
    );

    let start = std::time::Instant::now();
    executor(&service)
        .execute("SELECT 1", Some(DATASET), OUTPUT, Duration::from_millis(20), 5)
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(40));
    assert_eq!(service.calls().poll, 3);
}

/// Scenario: submission transport error
/// Given a service that cannot accept submissions
/// When execute is called
/// Then SubmissionTransport is raised and no poll happens
#[tokio::test]
async fn test_submission_transport_error() {
    let service = Arc::new(
        ScriptedQueryService::new().with_submit_error(ServiceError::http("connection refused")),
    );

    let err = executor(&service)
        .execute("SELECT 1", Some(DATASET), OUTPUT, INTERVAL, 3)
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::SubmissionTransport(_)));
    assert!(err.handle().is_none());
    assert_eq!(service.calls().poll, 0);
}

/// Scenario: schema-only statement
/// Given a namespace statement submitted without a dataset
/// When run_to_completion is called
/// Then the submission carries no dataset and nothing is fetched
#[tokio::test]
async fn test_schema_only_statement() {
    let service = Arc::new(
        ScriptedQueryService::new()
            .with_running(1)
            .with_status(QueryStatus::succeeded()),
    );
    let submission = QuerySubmission::without_dataset("CREATE DATABASE IF NOT EXISTS ran_copilot", OUTPUT);

    let completion = executor(&service)
        .run_to_completion(&submission, &PollPolicy::new(INTERVAL, 5))
        .await
        .unwrap();

    assert_eq!(completion.polls, 2);
    assert_eq!(service.submissions()[0].dataset, None);
    assert_eq!(service.calls().fetch, 0);
}

/// Exactly one submit per execution, regardless of how many polls it takes.
#[tokio::test]
async fn test_one_submit_per_execute() {
    for running in [0usize, 1, 4] {
        let service = Arc::new(
            ScriptedQueryService::new()
                .with_running(running)
                .with_status(QueryStatus::succeeded()),
        );

        executor(&service)
            .execute("SELECT 1", Some(DATASET), OUTPUT, INTERVAL, 10)
            .await
            .unwrap();

        assert_eq!(service.calls().submit, 1);
        assert_eq!(service.calls().poll, running + 1);
    }
}

/// Polling a handle that is already terminal keeps returning the same state.
#[tokio::test]
async fn test_terminal_poll_is_idempotent() {
    let service = ScriptedQueryService::new().with_status(QueryStatus::failed("HIVE_CURSOR_ERROR"));
    let handle = QueryHandle::new("mock-query-1");

    for _ in 0..5 {
        let status = service.poll(&handle).await.unwrap();
        assert_eq!(status.state, QueryState::Failed);
        assert_eq!(status.reason.as_deref(), Some("HIVE_CURSOR_ERROR"));
    }
}

/// Independent executions can share one executor concurrently.
#[tokio::test]
async fn test_concurrent_executions() {
    let service = Arc::new(
        ScriptedQueryService::new().with_pages(vec![ResultPage::last(vec![
            row(&["slice_id"]),
            row(&["eMBB"]),
            row(&["URLLC"]),
        ])]),
    );
    let exec = executor(&service);

    let runs = (0..8).map(|_| {
        let exec = exec.clone();
        tokio::spawn(async move {
            exec.execute("SELECT slice_id FROM s", Some(DATASET), OUTPUT, INTERVAL, 3)
                .await
        })
    });
    let results = futures::future::join_all(runs).await;

    for result in results {
        let result = result.unwrap().unwrap();
        assert_eq!(result.len(), 2);
    }
    assert_eq!(service.calls().submit, 8);
    assert_eq!(service.calls().fetch, 8);
}
