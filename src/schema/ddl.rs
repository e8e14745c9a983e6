//! Definition statement builders.
//!
//! Names are interpolated into statement text, so they are restricted to
//! plain identifiers; anything else is rejected before it reaches the service.

use crate::error::{QueryError, Result};

use super::TableDefinition;

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(QueryError::invalid_request(format!(
            "invalid {kind} name '{name}'"
        )))
    }
}

fn check_data_type(column: &str, data_type: &str) -> Result<()> {
    let valid = !data_type.trim().is_empty()
        && data_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_<>(),: ".contains(c));
    if valid {
        Ok(())
    } else {
        Err(QueryError::invalid_request(format!(
            "invalid type '{data_type}' for column '{column}'"
        )))
    }
}

/// `CREATE DATABASE IF NOT EXISTS <name>`
pub fn create_database_statement(database: &str) -> Result<String> {
    check_identifier("database", database)?;
    Ok(format!("CREATE DATABASE IF NOT EXISTS {database}"))
}

/// `DROP TABLE IF EXISTS <database>.<table>`
pub fn drop_table_statement(database: &str, table: &str) -> Result<String> {
    check_identifier("database", database)?;
    check_identifier("table", table)?;
    Ok(format!("DROP TABLE IF EXISTS {database}.{table}"))
}

/// Builds the external table statement for comma-delimited files.
pub fn create_external_table_statement(database: &str, table: &TableDefinition) -> Result<String> {
    check_identifier("database", database)?;
    check_identifier("table", &table.name)?;

    if table.columns.is_empty() {
        return Err(QueryError::invalid_request(format!(
            "table '{}' has no columns",
            table.name
        )));
    }
    if table.location.contains('\'') {
        return Err(QueryError::invalid_request(format!(
            "invalid location for table '{}'",
            table.name
        )));
    }

    let mut columns = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        check_identifier("column", &column.name)?;
        check_data_type(&column.name, &column.data_type)?;
        columns.push(format!("`{}` {}", column.name, column.data_type));
    }

    Ok(format!(
        "CREATE EXTERNAL TABLE {database}.{name} (\n  {columns}\n)\n\
         ROW FORMAT DELIMITED\n  FIELDS TERMINATED BY ','\n\
         LOCATION '{location}'\n\
         TBLPROPERTIES (\n  'skip.header.line.count'='{skip}',\n  'areColumnsQuoted'='false'\n)",
        name = table.name,
        columns = columns.join(",\n  "),
        location = table.location,
        skip = table.skip_header_lines,
    ))
}
