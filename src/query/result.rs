//! Accumulated query results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::service::Row;

/// All data rows of one completed query, in service order.
///
/// Values are kept as the text the service returned; callers parse them
/// knowing the schema they asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names, taken from the header row of the first page.
    pub columns: Vec<String>,

    /// Data rows. The header row is never included.
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Creates an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a result set from column names and rows.
    pub fn with_data(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns the number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the query matched nothing.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the text value at `row` for the named column.
    ///
    /// `None` covers a missing row, a missing column, and SQL NULL alike.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    /// Zips every row with the column names into a JSON object.
    ///
    /// NULL becomes JSON null. Cells beyond the known columns are dropped.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(name, cell)| {
                        let value = cell.clone().map(Value::String).unwrap_or(Value::Null);
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }

    /// Appends the rows of one page. The first page's leading row is taken as
    /// the header; later pages are appended whole.
    pub(crate) fn push_page(&mut self, rows: Vec<Row>, first_page: bool) {
        let mut rows = rows.into_iter();
        if first_page {
            if let Some(header) = rows.next() {
                self.columns = header.into_iter().map(Option::unwrap_or_default).collect();
            }
        }
        self.rows.extend(rows);
    }
}
