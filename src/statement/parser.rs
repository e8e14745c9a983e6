//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the generic dialect. Dialect-specific DDL (external
//! tables with storage clauses, for one) often fails to parse, so the leading
//! keyword decides in that case.

use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::StatementKind;

/// Leading keywords of statements that return rows.
const ROW_KEYWORDS: &[&str] = &["SELECT", "WITH", "VALUES", "EXPLAIN", "SHOW", "DESCRIBE", "DESC", "TABLE"];

/// Classifies statements by whether they return rows.
#[derive(Debug)]
pub struct StatementClassifier {
    dialect: GenericDialect,
}

impl Default for StatementClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementClassifier {
    /// Creates a new classifier.
    pub fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }

    /// Classifies a statement.
    ///
    /// With several statements the last one decides, since that is what
    /// the service reports results for.
    pub fn classify(&self, sql: &str) -> StatementKind {
        match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => match statements.last() {
                Some(statement) => kind_of(statement),
                None => StatementKind::Definition,
            },
            Err(e) => {
                debug!("Falling back to keyword classification: {}", e);
                classify_by_keyword(sql)
            }
        }
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_statement(sql: &str) -> StatementKind {
    StatementClassifier::new().classify(sql)
}

/// `SHOW` and `DESCRIBE` come in many AST variants, so anything that is not
/// a query or an explain is judged by the keyword of its rendered SQL.
fn kind_of(statement: &Statement) -> StatementKind {
    match statement {
        Statement::Query(_) | Statement::Explain { .. } | Statement::ExplainTable { .. } => {
            StatementKind::Rows
        }
        other => classify_by_keyword(&other.to_string()),
    }
}

/// Looks at the first keyword, skipping comments and opening parentheses.
fn classify_by_keyword(sql: &str) -> StatementKind {
    let keyword = sql
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .flat_map(str::split_whitespace)
        .next()
        .map(|word| word.trim_start_matches('(').to_uppercase());

    match keyword {
        Some(word) if ROW_KEYWORDS.contains(&word.as_str()) => StatementKind::Rows,
        _ => StatementKind::Definition,
    }
}
