//! Query execution for ran-query.
//!
//! This module isolates the submit / poll / fetch protocol and result
//! accumulation from the callers that build statements and format answers.

pub mod executor;
mod result;

pub use executor::{
    AsyncQueryExecutor, Completion, PollPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
pub use result::ResultSet;
