//! Rendering of result sets for the command line.

use std::fmt::Write as _;

use crate::error::{QueryError, Result};
use crate::query::ResultSet;

/// How `ranq run` prints results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Table,
    /// JSON array of objects keyed by column name.
    Json,
    /// Comma-separated values with a header line.
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(format!(
                "Invalid output format: {s}. Expected: table, json, or csv"
            )),
        }
    }
}

const NULL_DISPLAY: &str = "NULL";

/// Renders a result set in the requested format.
pub fn render(result: &ResultSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(result)),
        OutputFormat::Json => serde_json::to_string_pretty(&result.records())
            .map_err(|e| QueryError::internal(format!("Failed to encode results: {e}"))),
        OutputFormat::Csv => Ok(render_csv(result)),
    }
}

fn cell(row: &[Option<String>], i: usize) -> String {
    match row.get(i) {
        Some(Some(value)) => value.clone(),
        Some(None) => NULL_DISPLAY.to_string(),
        None => String::new(),
    }
}

fn render_table(result: &ResultSet) -> String {
    let width = result
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(result.columns.len()))
        .max()
        .unwrap_or(0);

    let mut widths: Vec<usize> = (0..width)
        .map(|i| result.columns.get(i).map_or(0, |c| c.chars().count()))
        .collect();
    for row in &result.rows {
        for (i, w) in widths.iter_mut().enumerate() {
            *w = (*w).max(cell(row, i).chars().count());
        }
    }

    let mut out = String::new();
    let line = |out: &mut String, cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect();
        let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
    };

    if !result.columns.is_empty() {
        let header = (0..width)
            .map(|i| result.columns.get(i).cloned().unwrap_or_default())
            .collect();
        line(&mut out, header);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("-+-"));
    }
    for row in &result.rows {
        line(&mut out, (0..width).map(|i| cell(row, i)).collect());
    }

    let noun = if result.len() == 1 { "row" } else { "rows" };
    let _ = writeln!(out, "({} {noun})", result.len());
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_csv(result: &ResultSet) -> String {
    let mut out = String::new();
    if !result.columns.is_empty() {
        let header: Vec<String> = result.columns.iter().map(|c| csv_field(c)).collect();
        let _ = writeln!(out, "{}", header.join(","));
    }
    for row in &result.rows {
        let fields: Vec<String> = row
            .iter()
            .map(|v| v.as_deref().map(csv_field).unwrap_or_default())
            .collect();
        let _ = writeln!(out, "{}", fields.join(","));
    }
    out
}
