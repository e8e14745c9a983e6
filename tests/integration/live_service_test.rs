//! Live query service integration tests.
//!
//! These tests require a reachable query service endpoint.
//! Set RANQ_ENDPOINT, RANQ_DATABASE and RANQ_OUTPUT_LOCATION to run them.

use std::sync::Arc;
use std::time::Duration;

use ran_query::error::QueryError;
use ran_query::query::AsyncQueryExecutor;
use ran_query::service::{AthenaClient, AthenaConfig};

struct LiveSettings {
    executor: AsyncQueryExecutor,
    database: String,
    output_location: String,
}

/// Helper to create an executor from the environment.
fn get_live_settings() -> Option<LiveSettings> {
    let endpoint = std::env::var("RANQ_ENDPOINT").ok()?;
    let database = std::env::var("RANQ_DATABASE").ok()?;
    let output_location = std::env::var("RANQ_OUTPUT_LOCATION").ok()?;

    let mut config = AthenaConfig::new(endpoint);
    if let Ok(token) = std::env::var("RANQ_AUTH_TOKEN") {
        config = config.with_auth_token(token);
    }
    let client = AthenaClient::new(config).ok()?;

    Some(LiveSettings {
        executor: AsyncQueryExecutor::new(Arc::new(client)),
        database,
        output_location,
    })
}

#[tokio::test]
async fn test_live_select_literal() {
    let Some(live) = get_live_settings() else {
        eprintln!("Skipping test: RANQ_ENDPOINT not set");
        return;
    };

    let result = live
        .executor
        .execute(
            "SELECT 1 AS num, 'hello' AS greeting",
            Some(live.database.as_str()),
            &live.output_location,
            Duration::from_millis(500),
            60,
        )
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["num".to_string(), "greeting".to_string()]);
    assert_eq!(result.len(), 1);
    assert_eq!(result.value(0, "greeting"), Some("hello"));
}

#[tokio::test]
async fn test_live_syntax_error() {
    let Some(live) = get_live_settings() else {
        eprintln!("Skipping test: RANQ_ENDPOINT not set");
        return;
    };

    let err = live
        .executor
        .execute(
            "SELEC 1",
            Some(live.database.as_str()),
            &live.output_location,
            Duration::from_millis(500),
            60,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::QueryFailed { .. } | QueryError::SubmissionTransport(_)
    ));
}
