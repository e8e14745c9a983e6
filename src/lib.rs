//! ran-query - asynchronous query execution against a managed
//! SQL-over-object-storage service.
//!
//! The core is [`query::AsyncQueryExecutor`], which submits a statement,
//! polls it to a terminal state and collects every result page. The service
//! it talks to sits behind the [`service::QueryService`] trait.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
pub mod schema;
pub mod service;
pub mod statement;
