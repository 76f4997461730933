// SPDX-License-Identifier: Apache-2.0

use crate::SheetsError;
use async_trait::async_trait;
use barberboard_model::CellValue;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 120,
        }
    }
}

/// Remote spreadsheet operations the service consumes. Row and column
/// indexes are 1-based, matching the grid coordinates users see.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Worksheet titles in sheet order. A missing spreadsheet is `NotFound`.
    async fn worksheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetsError>;

    /// Full grid of a worksheet, trailing blank rows omitted. A missing
    /// worksheet is `NotFound`.
    async fn read_rows(
        &self,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Row 1 of a worksheet; empty when the sheet has no header yet.
    async fn read_header_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<Vec<String>, SheetsError>;

    /// One combined fetch of several worksheets, grids in request order.
    /// Any missing worksheet fails the whole call; callers filter the title
    /// list against `worksheet_titles` first.
    async fn batch_read_rows(
        &self,
        spreadsheet_id: &str,
        titles: &[String],
    ) -> Result<Vec<Vec<Vec<String>>>, SheetsError>;

    async fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), SheetsError>;

    /// Removes every value in the worksheet, header row included.
    async fn clear_worksheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), SheetsError>;

    async fn update_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        values: &[CellValue],
    ) -> Result<(), SheetsError>;

    async fn append_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        values: &[CellValue],
    ) -> Result<(), SheetsError>;

    /// Inserts a fresh row at `row`, shifting that row and everything below
    /// it down by one.
    async fn insert_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        values: &[CellValue],
    ) -> Result<(), SheetsError>;

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), SheetsError>;

    /// Creates an empty spreadsheet owned by the current credential and
    /// returns its id.
    async fn create_spreadsheet(&self, title: &str) -> Result<String, SheetsError>;

    /// Reparents a file into the given folder, detaching prior parents.
    async fn move_to_folder(
        &self,
        spreadsheet_id: &str,
        folder_id: &str,
    ) -> Result<(), SheetsError>;

    async fn grant_writer(&self, spreadsheet_id: &str, email: &str) -> Result<(), SheetsError>;
}

/// Maps a raw grid to one JSON object per data row, keyed by the header row.
/// Numeric-looking cells become JSON numbers, everything else stays a
/// string; cells past the row's end and blank cells read as `""`. Columns
/// with an empty header are dropped.
#[must_use]
pub fn records_from_grid(grid: &[Vec<String>]) -> Vec<Value> {
    let Some((headers, data_rows)) = grid.split_first() else {
        return Vec::new();
    };
    data_rows
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            let mut record = Map::new();
            for (idx, header) in headers.iter().enumerate() {
                if header.trim().is_empty() {
                    continue;
                }
                let cell = row.get(idx).map(String::as_str).unwrap_or("");
                record.insert(header.clone(), numericise(cell));
            }
            Value::Object(record)
        })
        .collect()
}

fn numericise(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::String(String::new());
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = cell.parse::<f64>() {
        if float.is_finite() {
            if let Some(number) = Number::from_f64(float) {
                return Value::Number(number);
            }
        }
    }
    Value::String(cell.to_string())
}
