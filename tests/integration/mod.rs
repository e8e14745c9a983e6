//! Integration tests for ran-query.

pub mod config_test;
pub mod executor_test;
pub mod live_service_test;
