//! Schema setup for the telemetry dataset.
//!
//! Creates the namespace and the external tables that map processed
//! telemetry files in object storage. Every statement goes through
//! submit and poll only; none of them return rows.

mod ddl;

pub use ddl::{create_database_statement, create_external_table_statement, drop_table_statement};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::query::{AsyncQueryExecutor, PollPolicy};
use crate::service::QuerySubmission;

/// One column of an external table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

impl From<(String, String)> for ColumnDefinition {
    fn from((name, data_type): (String, String)) -> Self {
        Self { name, data_type }
    }
}

impl From<ColumnDefinition> for (String, String) {
    fn from(column: ColumnDefinition) -> Self {
        (column.name, column.data_type)
    }
}

/// An external table over comma-delimited files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,

    /// Object storage prefix holding the table's files.
    pub location: String,

    pub columns: Vec<ColumnDefinition>,

    /// Header lines to skip in every file.
    #[serde(default = "default_skip_header_lines")]
    pub skip_header_lines: u32,
}

fn default_skip_header_lines() -> u32 {
    1
}

impl TableDefinition {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            columns,
            skip_header_lines: default_skip_header_lines(),
        }
    }
}

/// Which step of table setup went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStep {
    Drop,
    Create,
}

/// A table that could not be dropped or created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub step: SetupStep,
    pub message: String,
}

/// Outcome of a setup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    pub database: String,
    /// Tables created, in configuration order.
    pub created: Vec<String>,
    pub failures: Vec<TableFailure>,
}

impl SetupReport {
    /// Returns true if every table was created.
    pub fn is_complete(&self) -> bool {
        !self
            .failures
            .iter()
            .any(|failure| failure.step == SetupStep::Create)
    }
}

/// Runs the namespace and table definition statements.
pub struct SchemaSetup<'a> {
    executor: &'a AsyncQueryExecutor,
    database: String,
    output_location: String,
    policy: PollPolicy,
}

impl<'a> SchemaSetup<'a> {
    pub fn new(
        executor: &'a AsyncQueryExecutor,
        database: impl Into<String>,
        output_location: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            executor,
            database: database.into(),
            output_location: output_location.into(),
            policy,
        }
    }

    /// Creates the namespace, then drops and recreates every table.
    ///
    /// A namespace failure aborts the run. Table failures are recorded and
    /// the remaining tables are still processed.
    pub async fn run(&self, tables: &[TableDefinition]) -> Result<SetupReport> {
        let mut report = SetupReport {
            database: self.database.clone(),
            ..Default::default()
        };

        info!(database = %self.database, "Creating database");
        let statement = create_database_statement(&self.database)?;
        self.executor
            .run_to_completion(
                &QuerySubmission::without_dataset(statement, &self.output_location),
                &self.policy,
            )
            .await?;

        for table in tables {
            if let Err(e) = self.drop_table(table).await {
                warn!(table = %table.name, "Could not drop table: {}", e);
                report.failures.push(TableFailure {
                    table: table.name.clone(),
                    step: SetupStep::Drop,
                    message: e.to_string(),
                });
            }
        }

        for table in tables {
            match self.create_table(table).await {
                Ok(()) => {
                    info!(table = %table.name, "Table created");
                    report.created.push(table.name.clone());
                }
                Err(e) => {
                    warn!(table = %table.name, "Error creating table: {}", e);
                    report.failures.push(TableFailure {
                        table: table.name.clone(),
                        step: SetupStep::Create,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn drop_table(&self, table: &TableDefinition) -> Result<()> {
        let statement = drop_table_statement(&self.database, &table.name)?;
        self.run_in_database(statement).await
    }

    async fn create_table(&self, table: &TableDefinition) -> Result<()> {
        let statement = create_external_table_statement(&self.database, table)?;
        self.run_in_database(statement).await
    }

    async fn run_in_database(&self, statement: String) -> Result<()> {
        let submission =
            QuerySubmission::new(statement, self.database.as_str(), self.output_location.as_str());
        self.executor
            .run_to_completion(&submission, &self.policy)
            .await
            .map(|_| ())
    }
}
