//! Configuration file integration tests.

use pretty_assertions::assert_eq;
use ran_query::config::Config;
use ran_query::schema::ColumnDefinition;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert!(config.query.database.is_none());
    assert!(config.tables.is_empty());
    assert_eq!(config.query.poll_policy().poll_interval, Duration::from_secs(1));
}

#[test]
fn test_load_full_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[service]
endpoint = "http://localhost:4566"
timeout_secs = 5

[query]
database = "ran_copilot"
output_location = "s3://ran-copilot-data-lake/athena-query-results/"
poll_interval_ms = 200
max_attempts = 15
page_size = 250

[[tables]]
name = "analytics_slice_metrics"
location = "s3://ran-copilot-data-lake/processed-data/slices/"
skip_header_lines = 0
columns = [
    ["timestamp", "timestamp"],
    ["slice_id", "string"],
    ["prb_utilization", "float"],
]
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();

    let athena = config.athena_config().unwrap();
    assert_eq!(athena.endpoint, "http://localhost:4566");
    assert_eq!(athena.timeout_secs, 5);
    assert_eq!(athena.page_size, 250);

    let policy = config.query.poll_policy();
    assert_eq!(policy.poll_interval, Duration::from_millis(200));
    assert_eq!(policy.max_attempts, 15);

    let table = &config.tables[0];
    assert_eq!(table.skip_header_lines, 0);
    assert_eq!(
        table.columns,
        vec![
            ColumnDefinition::new("timestamp", "timestamp"),
            ColumnDefinition::new("slice_id", "string"),
            ColumnDefinition::new("prb_utilization", "float"),
        ]
    );
    assert_eq!(
        config.query.require_output_location().unwrap(),
        "s3://ran-copilot-data-lake/athena-query-results/"
    );
}

#[test]
fn test_load_malformed_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[query\ndatabase = ").unwrap();

    let err = Config::load_from_file(file.path()).unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
}
