//! Statement classification module.
//!
//! Decides whether a statement returns rows (and so needs its results
//! fetched) or only defines or changes something, in which case reaching
//! SUCCEEDED is the whole answer.

mod parser;

pub use parser::{classify_statement, StatementClassifier};

use std::fmt;

/// What a statement produces once it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Produces a result set (SELECT, WITH, VALUES, EXPLAIN, SHOW, DESCRIBE).
    Rows,
    /// Produces no rows worth fetching (CREATE, DROP, ALTER, INSERT, ...).
    Definition,
}

impl StatementKind {
    /// Returns true if results should be fetched after success.
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Rows)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => write!(f, "rows"),
            Self::Definition => write!(f, "definition"),
        }
    }
}
